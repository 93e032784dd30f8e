use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::byte_size::ByteSize;
use crate::error::GraphError;

/// One step of a [`Script`](crate::Script).
///
/// A closed sum type with exactly three shapes, chosen by the parser from
/// the YAML/JSON shape of the command (an array becomes [`Command::Concurrent`],
/// a `{sleep: ..}` object becomes [`Command::Sleep`], and so on) — see
/// [`crate::parse`] for the decision.  There is no dynamic dispatch; every
/// consumer pattern-matches on this enum directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Pause the script for a fixed duration.
    Sleep(Duration),
    /// Send an HTTP request to another service in the graph.
    Request(RequestCommand),
    /// Execute every child command in parallel and join on all of them.
    ///
    /// A `Concurrent` command's children are never themselves `Concurrent`
    /// — nesting depth is exactly one, enforced at parse/validate time.
    Concurrent(Vec<Command>),
}

/// A [`Command::Request`] step: call another service by name with a given
/// request body size.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestCommand {
    pub service_name: String,
    pub size: ByteSize,
}

impl Serialize for Command {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        to_yaml_value(self).serialize(serializer)
    }
}

fn to_yaml_value(command: &Command) -> serde_yaml::Value {
    use serde_yaml::Value;
    match command {
        Command::Sleep(duration) => {
            let mut map = serde_yaml::Mapping::new();
            map.insert(
                Value::String("sleep".into()),
                Value::String(duration_to_string(*duration)),
            );
            Value::Mapping(map)
        }
        Command::Request(req) => {
            let mut outer = serde_yaml::Mapping::new();
            let call_value = if req.size == ByteSize::ZERO {
                Value::String(req.service_name.clone())
            } else {
                let mut inner = serde_yaml::Mapping::new();
                inner.insert(
                    Value::String("service".into()),
                    Value::String(req.service_name.clone()),
                );
                inner.insert(Value::String("size".into()), size_value(req.size));
                Value::Mapping(inner)
            };
            outer.insert(Value::String("call".into()), call_value);
            Value::Mapping(outer)
        }
        Command::Concurrent(children) => {
            Value::Sequence(children.iter().map(to_yaml_value).collect())
        }
    }
}

/// Renders a `size` as its human-readable form if that form reparses back
/// to the exact same byte count, otherwise falls back to the bare integer —
/// `to_human()` rounds to two decimal places per unit and is lossy for
/// byte counts that aren't exact at that precision.
fn size_value(size: ByteSize) -> serde_yaml::Value {
    let human = size.to_human();
    match ByteSize::parse(&human) {
        Ok(parsed) if parsed == size => serde_yaml::Value::String(human),
        _ => serde_yaml::Value::Number(size.bytes().into()),
    }
}

/// Renders a [`Duration`] the way it was most likely spelled in the source
/// document: the largest whole unit that divides it exactly.
pub fn duration_to_string(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        "0s".to_string()
    } else if nanos % 1_000_000_000 == 0 {
        format!("{}s", nanos / 1_000_000_000)
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{}us", nanos / 1_000)
    } else {
        format!("{nanos}ns")
    }
}

/// Parses a Go-style duration string such as `"100ms"`, `"1s"`, or
/// `"1h30m"`: a sequence of `<number><unit>` pairs, summed.
pub fn parse_duration(raw: &str) -> Result<Duration, GraphError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GraphError::InvalidDuration { raw: raw.to_string() });
    }
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = trimmed;
    let invalid = || GraphError::InvalidDuration { raw: raw.to_string() };

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(invalid)?;
        if digits_end == 0 {
            return Err(invalid());
        }
        let (number_str, after_number) = rest.split_at(digits_end);
        let number: f64 = number_str.parse().map_err(|_| invalid())?;

        let unit_end = after_number
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(after_number.len());
        let (unit, remainder) = after_number.split_at(unit_end);

        let nanos_per_unit: f64 = match unit {
            "ns" => 1.0,
            "us" | "\u{b5}s" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" => 60.0 * 1_000_000_000.0,
            "h" => 3_600.0 * 1_000_000_000.0,
            _ => return Err(invalid()),
        };
        total += Duration::from_nanos((number * nanos_per_unit).round() as u64);
        rest = remainder;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_durations() {
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
    }

    #[test]
    fn parses_compound_durations() {
        assert_eq!(
            parse_duration("1h30m").unwrap(),
            Duration::from_secs(3600 + 30 * 60)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("10zz").is_err());
    }

    #[test]
    fn request_with_default_size_serializes_as_bare_string() {
        let cmd = Command::Request(RequestCommand {
            service_name: "b".into(),
            size: ByteSize::ZERO,
        });
        let yaml = serde_yaml::to_string(&cmd).unwrap();
        assert_eq!(yaml.trim(), "call: b");
    }

    #[test]
    fn request_with_nonzero_size_serializes_as_object() {
        let cmd = Command::Request(RequestCommand {
            service_name: "b".into(),
            size: ByteSize::from_bytes(1024),
        });
        let yaml = serde_yaml::to_string(&cmd).unwrap();
        assert!(yaml.contains("service: b"));
        assert!(yaml.contains("size: 1KiB"));
    }

    #[test]
    fn request_with_a_size_the_human_form_would_round_incorrectly_falls_back_to_bytes() {
        // 1025 bytes rounds to "1.00KiB" under to_human(), which reparses to
        // 1024 — one byte short. The serializer must fall back to the exact
        // integer rather than losing it.
        let cmd = Command::Request(RequestCommand {
            service_name: "b".into(),
            size: ByteSize::from_bytes(1025),
        });
        let yaml = serde_yaml::to_string(&cmd).unwrap();
        assert!(yaml.contains("size: 1025"));
        assert!(!yaml.contains("KiB"));
    }
}
