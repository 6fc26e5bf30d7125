//! Fixed-point decimal with six fractional digits.
//!
//! Stored as an `i64` count of millionths (the same "smallest unit" approach
//! used for money elsewhere), so sums are exact and independent of order.
//! Products are computed in `i128` and rounded half away from zero.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, Sub};
use core::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use implodesc_core::ValueObject;

const SCALE: i64 = 1_000_000;
const FRACTION_DIGITS: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecimalError {
    #[error("not a decimal number: {0:?}")]
    Malformed(String),

    #[error("more than {FRACTION_DIGITS} fractional digits: {0:?}")]
    TooPrecise(String),

    #[error("value out of range: {0}")]
    OutOfRange(String),
}

/// Fixed-point decimal (six fractional digits).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(i64);

impl ValueObject for Decimal {}

impl Decimal {
    pub const ZERO: Decimal = Decimal(0);
    pub const ONE: Decimal = Decimal(SCALE);

    /// Build from a raw count of millionths (`1.85` is `1_850_000`).
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    pub fn from_int(value: i64) -> Self {
        Self(value.saturating_mul(SCALE))
    }

    /// Convert from a float, rounding to the nearest millionth.
    ///
    /// Returns `None` for NaN, infinities, and values outside the `i64` range.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * SCALE as f64).round();
        if scaled >= i64::MAX as f64 || scaled <= i64::MIN as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        let product = i128::from(self.0) * i128::from(rhs.0);
        let scale = i128::from(SCALE);
        let mut quotient = product / scale;
        let remainder = product % scale;
        if remainder.abs() * 2 >= scale {
            quotient += product.signum();
        }
        i64::try_from(quotient).ok().map(Self)
    }

    /// One of `parts` equal shares, truncated to whole micros. Zero parts
    /// leaves the value whole.
    pub fn split(self, parts: usize) -> Self {
        match i64::try_from(parts) {
            Ok(parts) if parts > 0 => Self(self.0 / parts),
            _ => self,
        }
    }
}

impl Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Mul for Decimal {
    type Output = Decimal;

    /// Saturates at the `i64` bounds.
    fn mul(self, rhs: Self) -> Self::Output {
        self.checked_mul(rhs).unwrap_or_else(|| {
            if (self.0 < 0) != (rhs.0 < 0) {
                Self(i64::MIN)
            } else {
                Self(i64::MAX)
            }
        })
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Decimal::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Decimal> for Decimal {
    fn sum<I: Iterator<Item = &'a Decimal>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<u32> for Decimal {
    fn from(value: u32) -> Self {
        Self::from_int(i64::from(value))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / SCALE as u64;
        let frac = abs % SCALE as u64;
        if frac == 0 {
            return write!(f, "{sign}{whole}");
        }
        let digits = format!("{frac:0width$}", width = FRACTION_DIGITS);
        write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (negative, unsigned) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };
        let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(DecimalError::Malformed(s.to_string()));
        }
        if frac.len() > FRACTION_DIGITS {
            return Err(DecimalError::TooPrecise(s.to_string()));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| DecimalError::OutOfRange(s.to_string()))?
        };
        let frac: i64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<width$}", width = FRACTION_DIGITS)
                .parse()
                .map_err(|_| DecimalError::Malformed(s.to_string()))?
        };

        let micros = whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(|| DecimalError::OutOfRange(s.to_string()))?;
        Ok(Self(if negative { -micros } else { micros }))
    }
}

// JSON carries decimals as plain numbers so provider payloads and clients can
// read them without a custom schema.
impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}

struct DecimalVisitor;

impl Visitor<'_> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a decimal string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        v.checked_mul(SCALE)
            .map(Decimal)
            .ok_or_else(|| E::custom(DecimalError::OutOfRange(v.to_string())))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        let signed = i64::try_from(v).map_err(|_| E::custom(DecimalError::OutOfRange(v.to_string())))?;
        self.visit_i64(signed)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Decimal::from_f64(v).ok_or_else(|| E::custom(DecimalError::OutOfRange(v.to_string())))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_displays_canonical_form() {
        assert_eq!(d("1.85").micros(), 1_850_000);
        assert_eq!(d("0.000149").micros(), 149);
        assert_eq!(d("-2.5").micros(), -2_500_000);
        assert_eq!(d("10").to_string(), "10");
        assert_eq!(d("18.50").to_string(), "18.5");
        assert_eq!(d("0.000149").to_string(), "0.000149");
        assert_eq!(d("-0.5").to_string(), "-0.5");
    }

    #[test]
    fn split_truncates_to_whole_micros() {
        assert_eq!(d("1").split(2), d("0.5"));
        assert_eq!(d("1").split(3), d("0.333333"));
        assert_eq!(d("4.2").split(0), d("4.2"));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!("abc".parse::<Decimal>(), Err(DecimalError::Malformed(_))));
        assert!(matches!(".".parse::<Decimal>(), Err(DecimalError::Malformed(_))));
        assert!(matches!("1.2.3".parse::<Decimal>(), Err(DecimalError::Malformed(_))));
        assert!(matches!(
            "0.0000001".parse::<Decimal>(),
            Err(DecimalError::TooPrecise(_))
        ));
    }

    #[test]
    fn multiplication_is_exact_for_reference_factors() {
        assert_eq!(Decimal::from_int(10) * d("1.85"), d("18.5"));
        assert_eq!(d("500") * d("2") * d("0.12"), d("120"));
        assert_eq!(d("1000") * d("0.000149"), d("0.149"));
    }

    #[test]
    fn multiplication_rounds_half_away_from_zero() {
        // 0.000001 * 0.5 = 0.0000005 -> rounds to 0.000001
        assert_eq!(d("0.000001") * d("0.5"), d("0.000001"));
        assert_eq!(d("-0.000001") * d("0.5"), d("-0.000001"));
        assert_eq!(d("0.000001") * d("0.4"), Decimal::ZERO);
    }

    #[test]
    fn multiplication_saturates_instead_of_wrapping() {
        let big = Decimal::from_micros(i64::MAX);
        assert_eq!(big * d("2"), Decimal::from_micros(i64::MAX));
        assert_eq!(big * d("-2"), Decimal::from_micros(i64::MIN));
    }

    #[test]
    fn float_conversion_rounds_to_micros() {
        assert_eq!(Decimal::from_f64(6.2), Some(d("6.2")));
        assert_eq!(Decimal::from_f64(0.1234567), Some(d("0.123457")));
        assert_eq!(Decimal::from_f64(f64::NAN), None);
        assert_eq!(Decimal::from_f64(f64::INFINITY), None);
    }

    #[test]
    fn json_accepts_numbers_and_strings() {
        let from_float: Decimal = serde_json::from_str("2.1").unwrap();
        let from_int: Decimal = serde_json::from_str("500").unwrap();
        let from_str: Decimal = serde_json::from_str("\"0.8\"").unwrap();
        assert_eq!(from_float, d("2.1"));
        assert_eq!(from_int, d("500"));
        assert_eq!(from_str, d("0.8"));
        assert_eq!(serde_json::to_string(&d("18.5")).unwrap(), "18.5");
    }
}
