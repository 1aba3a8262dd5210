use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Sub},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Number of decimal places carried by every [`Amount`].
pub const AMOUNT_SCALE: u32 = 2;
/// The smallest amount the gateway will ever ask a customer to pay (0.01).
pub const MIN_PAYMENT_AMOUNT: Amount = Amount(1);
/// The step used to disambiguate colliding amounts on one wallet (0.01).
pub const AMOUNT_INCREMENT: Amount = Amount(1);

//--------------------------------------        Amount         ---------------------------------------------------------
/// A fixed-precision quantity with two decimal places, stored as an integer number of hundredths.
///
/// Quote (fiat) amounts and on-chain amounts share this type. All conversions into an `Amount` round half away from
/// zero, so `1.005` becomes `1.01` and `-1.005` becomes `-1.01`.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct Amount(i64);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(inplace Amount, AddAssign, add_assign);
op!(scalar Amount, Mul, mul);

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Value cannot be represented as a two-decimal amount: {0}")]
    OutOfRange(String),
    #[error("Invalid amount: {0}")]
    InvalidFormat(String),
}

impl Amount {
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount in hundredths.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Rounds `value` to two decimal places (half away from zero) and converts it into an `Amount`.
    pub fn from_decimal(value: Decimal) -> Result<Self, AmountError> {
        let rounded = value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero);
        let cents = rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|c| c.to_i64())
            .ok_or_else(|| AmountError::OutOfRange(value.to_string()))?;
        Ok(Self(cents))
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, AMOUNT_SCALE)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// The shortest form, as a `%g` float formatter writes it: no trailing zeros, and exponent notation from one
    /// million up. `10.00` is `10`, `12.50` is `12.5` and `2500000.00` is `2.5e+06`.
    pub fn to_compact_string(&self) -> String {
        let hundredths = self.0.unsigned_abs();
        if hundredths < 100_000_000 {
            return self.to_decimal().normalize().to_string();
        }
        let digits = hundredths.to_string();
        let exponent = digits.len() - 1 - AMOUNT_SCALE as usize;
        let (lead, rest) = digits.trim_end_matches('0').split_at(1);
        let sign = if self.0 < 0 { "-" } else { "" };
        let fraction = if rest.is_empty() { String::new() } else { format!(".{rest}") };
        format!("{sign}{lead}{fraction}e+{exponent:02}")
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| AmountError::InvalidFormat(format!("{s}. {e}")))?;
        Self::from_decimal(value)
    }
}

impl TryFrom<f64> for Amount {
    type Error = AmountError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let value = Decimal::try_from(value).map_err(|e| AmountError::OutOfRange(format!("{value}. {e}")))?;
        Self::from_decimal(value)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.to_decimal().to_f64().ok_or_else(|| serde::ser::Error::custom("amount out of range"))?;
        serializer.serialize_f64(value)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAmount {
            Number(f64),
            Text(String),
        }
        match RawAmount::deserialize(deserializer)? {
            RawAmount::Number(v) => Amount::try_from(v).map_err(de::Error::custom),
            RawAmount::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(Amount::from_str("1.005").unwrap(), Amount::from_cents(101));
        assert_eq!(Amount::from_str("1.004").unwrap(), Amount::from_cents(100));
        assert_eq!(Amount::from_str("-1.005").unwrap(), Amount::from_cents(-101));
        let ratio = Decimal::from(10) / Decimal::from_str("7.1").unwrap();
        assert_eq!(Amount::from_decimal(ratio).unwrap(), Amount::from_cents(141));
    }

    #[test]
    fn display() {
        assert_eq!(Amount::from_cents(143).to_string(), "1.43");
        assert_eq!(Amount::from_cents(100).to_string(), "1.00");
        assert_eq!(Amount::from_cents(5).to_string(), "0.05");
        assert_eq!(MIN_PAYMENT_AMOUNT.to_string(), "0.01");
    }

    #[test]
    fn compact_form() {
        assert_eq!(Amount::from_cents(1000).to_compact_string(), "10");
        assert_eq!(Amount::from_cents(143).to_compact_string(), "1.43");
        assert_eq!(Amount::from_cents(1250).to_compact_string(), "12.5");
        assert_eq!(Amount::from_cents(1).to_compact_string(), "0.01");
        assert_eq!(Amount::from_cents(0).to_compact_string(), "0");
        assert_eq!(Amount::from_cents(-150).to_compact_string(), "-1.5");
        assert_eq!(Amount::from_cents(99_999_999).to_compact_string(), "999999.99");
        assert_eq!(Amount::from_cents(100_000_000).to_compact_string(), "1e+06");
        assert_eq!(Amount::from_cents(250_000_000).to_compact_string(), "2.5e+06");
        assert_eq!(Amount::from_cents(123_456_789).to_compact_string(), "1.23456789e+06");
        assert_eq!(Amount::from_cents(-100_000_000_000).to_compact_string(), "-1e+09");
    }

    #[test]
    fn arithmetic() {
        let base = Amount::from_cents(143);
        assert_eq!(base + AMOUNT_INCREMENT * 3, Amount::from_cents(146));
        assert_eq!(base - AMOUNT_INCREMENT, Amount::from_cents(142));
        let total: Amount = vec![base, base].into_iter().sum();
        assert_eq!(total, Amount::from_cents(286));
    }

    #[test]
    fn json_forms() {
        let a: Amount = serde_json::from_str("10").unwrap();
        assert_eq!(a, Amount::from_cents(1000));
        let a: Amount = serde_json::from_str("\"7.125\"").unwrap();
        assert_eq!(a, Amount::from_cents(713));
        let a: Amount = serde_json::from_str("1.43").unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), "1.43");
        assert!(serde_json::from_str::<Amount>("\"ten\"").is_err());
    }
}
