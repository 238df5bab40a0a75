// src/domain/decimal.rs

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits a `Decimal` can hold exactly.
pub const DECIMAL_PLACES: usize = 6;
const SCALE: i64 = 1_000_000;

/// Fixed-point decimal stored as integer micros (value * 10^6).
///
/// Prices and percentages never go through floating point, so equality is by
/// value: `1.5` and `1.500000` are the same `Decimal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decimal(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    #[error("empty numeric value")]
    Empty,
    #[error("invalid numeric value '{0}'")]
    Invalid(String),
    #[error("numeric value '{0}' has more than 6 decimal places")]
    TooManyDecimalPlaces(String),
    #[error("numeric value '{0}' is out of range")]
    Overflow(String),
}

impl Decimal {
    pub const fn from_micros(micros: i64) -> Self {
        Decimal(micros)
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    pub fn from_int(value: i64) -> Option<Self> {
        value.checked_mul(SCALE).map(Decimal)
    }

    /// Parses a plain decimal string (`-12`, `3.25`, `+0.5`).
    ///
    /// No exponents, no thousands separators, at most six fractional digits.
    pub fn parse(s: &str) -> Result<Self, DecimalError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DecimalError::Empty);
        }

        let (negative, digits) = if let Some(rest) = s.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = s.strip_prefix('+') {
            (false, rest)
        } else {
            (false, s)
        };

        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

        let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(DecimalError::Invalid(s.to_string()));
        }

        if frac_part.len() > DECIMAL_PLACES {
            return Err(DecimalError::TooManyDecimalPlaces(s.to_string()));
        }

        let overflow = || DecimalError::Overflow(s.to_string());

        let int_val: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| overflow())?
        };

        // Right-pad the fraction so "5" after the dot means 500000 micros.
        let frac_val: i64 = if frac_part.is_empty() {
            0
        } else {
            format!("{frac_part:0<width$}", width = DECIMAL_PLACES)
                .parse()
                .map_err(|_| overflow())?
        };

        let micros = int_val
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac_val))
            .ok_or_else(overflow)?;

        Ok(Decimal(if negative { -micros } else { micros }))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let scale = SCALE as u64;
        let int_part = abs / scale;
        let frac_part = abs % scale;

        if self.0 < 0 {
            write!(f, "-")?;
        }
        if frac_part == 0 {
            return write!(f, "{int_part}");
        }
        let frac = format!("{frac_part:0>width$}", width = DECIMAL_PLACES);
        write!(f, "{int_part}.{}", frac.trim_end_matches('0'))
    }
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::parse(s)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}

/// Snapshots carry prices either as JSON numbers or as strings.
struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a decimal number or a decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        Decimal::parse(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Decimal::from_int(v).ok_or_else(|| E::custom(DecimalError::Overflow(v.to_string())))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        i64::try_from(v)
            .ok()
            .and_then(Decimal::from_int)
            .ok_or_else(|| E::custom(DecimalError::Overflow(v.to_string())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
        // Shortest round-trip form, so 0.1 arrives as "0.1".
        Decimal::parse(&v.to_string()).map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_compares_by_value() {
        assert_eq!(Decimal::parse("1.5").unwrap(), Decimal::parse("1.500000").unwrap());
        assert_eq!(Decimal::parse("100000").unwrap().micros(), 100_000_000_000);
        assert_eq!(Decimal::parse("-0.25").unwrap().micros(), -250_000);
        assert_eq!(Decimal::parse(".5").unwrap().micros(), 500_000);
        assert!(Decimal::parse("2").unwrap() > Decimal::parse("1.999999").unwrap());
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Decimal::parse(""), Err(DecimalError::Empty));
        assert!(matches!(Decimal::parse("1e5"), Err(DecimalError::Invalid(_))));
        assert!(matches!(Decimal::parse("1.2.3"), Err(DecimalError::Invalid(_))));
        assert!(matches!(Decimal::parse("-"), Err(DecimalError::Invalid(_))));
        assert!(matches!(
            Decimal::parse("0.1234567"),
            Err(DecimalError::TooManyDecimalPlaces(_))
        ));
        assert!(matches!(
            Decimal::parse("99999999999999999"),
            Err(DecimalError::Overflow(_))
        ));
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Decimal::parse("250000.50").unwrap().to_string(), "250000.5");
        assert_eq!(Decimal::parse("-3.000").unwrap().to_string(), "-3");
        assert_eq!(Decimal::parse("0.000001").unwrap().to_string(), "0.000001");
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let values: Vec<Decimal> = serde_json::from_str(r#"[12, "12.50", 0.1]"#).unwrap();
        assert_eq!(values[0], Decimal::from_int(12).unwrap());
        assert_eq!(values[1].to_string(), "12.5");
        assert_eq!(values[2].micros(), 100_000);
        assert_eq!(serde_json::to_string(&values[1]).unwrap(), "\"12.5\"");
    }
}
