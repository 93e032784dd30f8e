use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GraphError;

/// A bounded rational in the closed interval `[0, 1]`.
///
/// Parses from either a bare number in that range (`0.5`) or the literal
/// form `"N%"` where `0 <= N <= 100` (`"50%"`). The two forms are
/// equivalent: `Percentage::parse("50%") == Percentage::parse_fraction(0.5)`.
///
/// ```yaml
/// errorRate: 2%
/// # or
/// errorRate: 0.02
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Percentage(f64);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0.0);

    /// Parses a bare fraction already in `[0, 1]`.
    pub fn parse_fraction(value: f64) -> Result<Self, GraphError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(GraphError::OutOfRange { value });
        }
        Ok(Percentage(value))
    }

    /// Parses either a bare fraction or the `"N%"` form.
    pub fn parse(raw: &str) -> Result<Self, GraphError> {
        let trimmed = raw.trim();
        if let Some(digits) = trimmed.strip_suffix('%') {
            let n: f64 = digits
                .trim()
                .parse()
                .map_err(|_| GraphError::OutOfRange { value: f64::NAN })?;
            Self::parse_fraction(n / 100.0)
        } else {
            let n: f64 = trimmed
                .parse()
                .map_err(|_| GraphError::OutOfRange { value: f64::NAN })?;
            Self::parse_fraction(n)
        }
    }

    /// The fraction in `[0, 1]`.
    pub fn as_fraction(&self) -> f64 {
        self.0
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::ZERO
    }
}

impl PartialEq for Percentage {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for Percentage {}

impl PartialOrd for Percentage {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Percentage {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Percentage {
    /// Canonical string form: `"N.NN%"`, two decimal places.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0 * 100.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PercentageRepr {
    Number(f64),
    String(String),
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        match PercentageRepr::deserialize(deserializer)? {
            PercentageRepr::Number(n) => {
                Percentage::parse_fraction(n).map_err(D::Error::custom)
            }
            PercentageRepr::String(s) => Percentage::parse(&s).map_err(D::Error::custom),
        }
    }
}

impl Serialize for Percentage {
    /// Serializes as the raw fraction, not the two-decimal `Display` form —
    /// the latter is lossy for any value not exactly representable at
    /// percent-with-two-decimals precision.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_form_matches_fraction_form() {
        for n in 0..=100 {
            let from_percent = Percentage::parse(&format!("{n}%")).unwrap();
            let from_fraction = Percentage::parse_fraction(n as f64 / 100.0).unwrap();
            assert_eq!(from_percent, from_fraction);
        }
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Percentage::parse("101%").is_err());
        assert!(Percentage::parse_fraction(-0.1).is_err());
        assert!(Percentage::parse_fraction(1.1).is_err());
    }

    #[test]
    fn display_form_has_two_decimals() {
        let p = Percentage::parse("2%").unwrap();
        assert_eq!(p.to_string(), "2.00%");
    }

    #[test]
    fn round_trips_through_serde() {
        let p = Percentage::parse("12.5%").unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let back: Percentage = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn round_trips_a_value_the_two_decimal_display_form_would_lose() {
        let p = Percentage::parse_fraction(0.123456).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let back: Percentage = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
