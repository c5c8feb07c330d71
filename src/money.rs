use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of minor units (cents) per major currency unit.
const MINOR_PER_UNIT: i64 = 100;

/// Fixed-point decimal scale used for all monetary values.
pub const MONEY_SCALE: u32 = 2;

/// Errors produced when constructing or combining monetary values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("malformed amount: {0}")]
    InvalidFormat(String),

    #[error("amount {0} has sub-cent precision")]
    SubCentPrecision(Decimal),

    #[error("amount out of representable range")]
    Overflow,
}

/// A monetary amount held as an exact count of minor currency units.
///
/// All arithmetic is integer arithmetic at a fixed scale of two decimal
/// places, so comparisons are exact and repeated summation cannot drift the
/// way binary floating point does. Negative values are representable; call
/// sites that require non-negative amounts (payments, grand totals) enforce
/// that themselves.
///
/// Inputs carrying finer precision than one cent are rejected with
/// [`MoneyError::SubCentPrecision`] rather than silently quantized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MoneyValue(i64);

impl MoneyValue {
    pub const ZERO: MoneyValue = MoneyValue(0);

    /// Builds a value from a raw count of minor units (cents).
    pub const fn from_minor_units(minor: i64) -> Self {
        MoneyValue(minor)
    }

    /// Builds a value from a whole number of major units.
    pub const fn from_major_units(major: i64) -> Self {
        MoneyValue(major * MINOR_PER_UNIT)
    }

    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: MoneyValue) -> Result<MoneyValue, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(MoneyValue)
            .ok_or(MoneyError::Overflow)
    }

    pub fn checked_sub(self, other: MoneyValue) -> Result<MoneyValue, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(MoneyValue)
            .ok_or(MoneyError::Overflow)
    }

    /// Multiplies by an integer quantity, as when extending a line item.
    pub fn checked_mul_int(self, factor: i64) -> Result<MoneyValue, MoneyError> {
        self.0
            .checked_mul(factor)
            .map(MoneyValue)
            .ok_or(MoneyError::Overflow)
    }

    /// Subtraction that clamps at the representable range instead of failing.
    /// Used where a deficit is immediately clamped to zero anyway.
    pub const fn saturating_sub(self, other: MoneyValue) -> MoneyValue {
        MoneyValue(self.0.saturating_sub(other.0))
    }

    pub fn max(self, other: MoneyValue) -> MoneyValue {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    /// Sums a sequence of values, failing on overflow instead of wrapping.
    pub fn checked_sum<I>(values: I) -> Result<MoneyValue, MoneyError>
    where
        I: IntoIterator<Item = MoneyValue>,
    {
        values
            .into_iter()
            .try_fold(MoneyValue::ZERO, MoneyValue::checked_add)
    }

    /// Converts to the `Decimal` representation used by the persistence layer.
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, MONEY_SCALE)
    }

    /// Renders as a plain decimal string with exactly two fraction digits.
    pub fn to_display_string(self) -> String {
        self.to_string()
    }
}

impl TryFrom<Decimal> for MoneyValue {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        let truncated =
            value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero);
        if truncated != value {
            return Err(MoneyError::SubCentPrecision(value));
        }
        let minor = value
            .checked_mul(Decimal::from(MINOR_PER_UNIT))
            .ok_or(MoneyError::Overflow)?;
        minor.to_i64().map(MoneyValue).ok_or(MoneyError::Overflow)
    }
}

impl FromStr for MoneyValue {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())
            .map_err(|_| MoneyError::InvalidFormat(s.to_string()))?;
        MoneyValue::try_from(decimal)
    }
}

impl fmt::Display for MoneyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(
            f,
            "{}{}.{:02}",
            sign,
            magnitude / MINOR_PER_UNIT as u64,
            magnitude % MINOR_PER_UNIT as u64
        )
    }
}

impl utoipa::PartialSchema for MoneyValue {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        utoipa::openapi::ObjectBuilder::new()
            .schema_type(utoipa::openapi::schema::Type::String)
            .description(Some("Fixed-point decimal amount with two fraction digits"))
            .into()
    }
}

impl utoipa::ToSchema for MoneyValue {}

impl Serialize for MoneyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MoneyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_two_decimal_strings() {
        assert_eq!("420.00".parse::<MoneyValue>().unwrap().minor_units(), 42_000);
        assert_eq!("0.01".parse::<MoneyValue>().unwrap().minor_units(), 1);
        assert_eq!("-3.50".parse::<MoneyValue>().unwrap().minor_units(), -350);
        assert_eq!("1000".parse::<MoneyValue>().unwrap().minor_units(), 100_000);
    }

    #[test]
    fn rejects_sub_cent_precision() {
        assert!(matches!(
            "1.005".parse::<MoneyValue>(),
            Err(MoneyError::SubCentPrecision(_))
        ));
        assert!(matches!(
            MoneyValue::try_from(dec!(0.001)),
            Err(MoneyError::SubCentPrecision(_))
        ));
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(matches!(
            "12,50".parse::<MoneyValue>(),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!("".parse::<MoneyValue>().is_err());
    }

    #[test]
    fn display_keeps_two_fraction_digits() {
        assert_eq!(MoneyValue::from_minor_units(42_000).to_string(), "420.00");
        assert_eq!(MoneyValue::from_minor_units(5).to_string(), "0.05");
        assert_eq!(MoneyValue::from_minor_units(-350).to_string(), "-3.50");
        assert_eq!(MoneyValue::ZERO.to_string(), "0.00");
    }

    #[test]
    fn decimal_round_trip_is_exact() {
        let value = MoneyValue::from_minor_units(1_234_56);
        assert_eq!(MoneyValue::try_from(value.to_decimal()).unwrap(), value);
    }

    #[test]
    fn thousand_cents_sum_exactly() {
        // The canonical binary-float failure mode: 1000 * 0.01.
        let cent = "0.01".parse::<MoneyValue>().unwrap();
        let total = MoneyValue::checked_sum(std::iter::repeat(cent).take(1000)).unwrap();
        assert_eq!(total, "10.00".parse::<MoneyValue>().unwrap());
    }

    #[test]
    fn checked_arithmetic_flags_overflow() {
        let max = MoneyValue::from_minor_units(i64::MAX);
        assert_eq!(
            max.checked_add(MoneyValue::from_minor_units(1)),
            Err(MoneyError::Overflow)
        );
        let min = MoneyValue::from_minor_units(i64::MIN);
        assert_eq!(
            min.checked_sub(MoneyValue::from_minor_units(1)),
            Err(MoneyError::Overflow)
        );
    }

    #[test]
    fn subtraction_may_go_negative() {
        let billed = MoneyValue::from_major_units(100);
        let paid = MoneyValue::from_major_units(120);
        let due = billed.checked_sub(paid).unwrap();
        assert!(due.is_negative());
        assert_eq!(due.to_string(), "-20.00");
    }

    #[test]
    fn max_picks_larger_operand() {
        let a = MoneyValue::from_minor_units(-5);
        assert_eq!(a.max(MoneyValue::ZERO), MoneyValue::ZERO);
        assert_eq!(
            MoneyValue::from_minor_units(7).max(MoneyValue::from_minor_units(3)),
            MoneyValue::from_minor_units(7)
        );
    }

    #[test]
    fn serde_uses_display_string() {
        let value = MoneyValue::from_minor_units(1_50);
        assert_eq!(serde_json::to_string(&value).unwrap(), "\"1.50\"");
        let parsed: MoneyValue = serde_json::from_str("\"1.50\"").unwrap();
        assert_eq!(parsed, value);
    }
}
