use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GraphError;

/// A non-negative byte count.
///
/// Parses from a bare integer (`10240`, meaning bytes) or a human-readable
/// form such as `"10k"`, `"10 kb"`, `"10Kb"`, `"10KiB"`, `"100 Mb"`. The unit
/// is matched case-insensitively, the space before it is optional, and every
/// multiple is binary (`x1024`) regardless of whether the "i" is present in
/// the unit: `"10k" == "10 KB" == "10KiB" == 10240`.
///
/// ```yaml
/// responseSize: 10KiB
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(u64);

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(-?[0-9]+(?:\.[0-9]+)?)\s*([a-z]*)\s*$").unwrap()
    })
}

impl ByteSize {
    pub const ZERO: ByteSize = ByteSize(0);

    pub fn from_bytes(bytes: u64) -> Self {
        ByteSize(bytes)
    }

    pub fn bytes(&self) -> u64 {
        self.0
    }

    /// Parses a bare integer or a human-readable byte size string.
    pub fn parse(raw: &str) -> Result<Self, GraphError> {
        let caps = pattern()
            .captures(raw)
            .ok_or_else(|| GraphError::InvalidByteSize { raw: raw.to_string() })?;
        let number: f64 = caps[1]
            .parse()
            .map_err(|_| GraphError::InvalidByteSize { raw: raw.to_string() })?;
        let unit = caps[2].to_ascii_lowercase();
        let multiplier: u64 = match unit.as_str() {
            "" | "b" => 1,
            "k" | "kb" | "kib" => 1 << 10,
            "m" | "mb" | "mib" => 1 << 20,
            "g" | "gb" | "gib" => 1 << 30,
            "t" | "tb" | "tib" => 1 << 40,
            _ => return Err(GraphError::InvalidByteSize { raw: raw.to_string() }),
        };
        let value = number * multiplier as f64;
        if value < 0.0 {
            return Err(GraphError::NegativeSize { value: value as i64 });
        }
        Ok(ByteSize(value.round() as u64))
    }

    /// Renders the nearest binary (KiB/MiB/GiB/TiB) form.
    pub fn to_human(&self) -> String {
        const UNITS: [(&str, u64); 4] = [
            ("TiB", 1u64 << 40),
            ("GiB", 1u64 << 30),
            ("MiB", 1u64 << 20),
            ("KiB", 1u64 << 10),
        ];
        for (name, factor) in UNITS {
            if self.0 >= factor {
                let value = self.0 as f64 / factor as f64;
                return if value.fract() == 0.0 {
                    format!("{}{}", value as u64, name)
                } else {
                    format!("{value:.2}{name}")
                };
            }
        }
        format!("{}B", self.0)
    }
}

impl Default for ByteSize {
    fn default() -> Self {
        ByteSize::ZERO
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ByteSizeRepr {
    Number(i64),
    String(String),
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        match ByteSizeRepr::deserialize(deserializer)? {
            ByteSizeRepr::Number(n) => {
                if n < 0 {
                    return Err(D::Error::custom(GraphError::NegativeSize { value: n }));
                }
                Ok(ByteSize(n as u64))
            }
            ByteSizeRepr::String(s) => ByteSize::parse(&s).map_err(D::Error::custom),
        }
    }
}

impl Serialize for ByteSize {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_agree() {
        let forms = ["10k", "10 KB", "10KiB", "10240"];
        let parsed: Vec<u64> = forms
            .iter()
            .map(|s| ByteSize::parse(s).unwrap().bytes())
            .collect();
        assert!(parsed.iter().all(|&b| b == 10240));
    }

    #[test]
    fn mixed_case_and_spacing() {
        assert_eq!(ByteSize::parse("100 Mb").unwrap().bytes(), 100 * (1 << 20));
        assert_eq!(ByteSize::parse("100mib").unwrap().bytes(), 100 * (1 << 20));
    }

    #[test]
    fn rejects_negative() {
        assert!(ByteSize::parse("-5").is_err());
        assert!(ByteSize::parse("-5k").is_err());
    }

    #[test]
    fn human_form_round_trips_exact_binary_values() {
        let b = ByteSize::from_bytes(10 * (1 << 10));
        assert_eq!(b.to_human(), "10KiB");
        assert_eq!(ByteSize::parse(&b.to_human()).unwrap(), b);
    }
}
