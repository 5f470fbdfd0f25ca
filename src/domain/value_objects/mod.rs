//! Value Objects for the fashion catalog

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Garment size. Each product carries at most one stock variant per size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Size { S, M, L, XL }

impl Size {
    pub fn as_str(&self) -> &'static str {
        match self { Self::S => "S", Self::M => "M", Self::L => "L", Self::XL => "XL" }
    }
}

impl FromStr for Size {
    type Err = SizeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S" => Ok(Self::S),
            "M" => Ok(Self::M),
            "L" => Ok(Self::L),
            "XL" => Ok(Self::XL),
            other => Err(SizeError(other.to_string())),
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct SizeError(pub String);
impl std::error::Error for SizeError {}
impl fmt::Display for SizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown size '{}'", self.0) }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn vnd(amount: Decimal) -> Self { Self::new(amount, "VND") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }

    /// Applies a percentage discount, clamped to 0..=100.
    pub fn discounted(&self, percent: u8) -> Money {
        let percent = Decimal::from(percent.min(100));
        let factor = (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED;
        Money::new((self.amount * factor).round_dp(2), &self.currency)
    }

    /// Amount scaled by 100 and truncated, the unit payment gateways expect.
    pub fn minor_units(&self) -> i64 {
        (self.amount * Decimal::ONE_HUNDRED).trunc().to_i64().unwrap_or(0)
    }
}

impl Default for Money { fn default() -> Self { Self::zero("VND") } }

#[derive(Debug, Clone)] pub enum MoneyError { CurrencyMismatch }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Currency mismatch") }
}

/// A strictly positive item count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::Zero); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn checked_add(&self, other: Quantity) -> Option<Self> { self.0.checked_add(other.0).map(Self) }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 { fn from(q: Quantity) -> u32 { q.0 } }

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { Zero }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "quantity must be positive") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_parse() {
        assert_eq!("XL".parse::<Size>().unwrap(), Size::XL);
        assert!("xl".parse::<Size>().is_err());
        assert!("XXL".parse::<Size>().is_err());
    }

    #[test]
    fn test_money_add() {
        let a = Money::vnd(Decimal::new(100, 0));
        let b = Money::vnd(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert!(a.add(&Money::new(Decimal::ONE, "USD")).is_err());
    }

    #[test]
    fn test_money_discount_and_minor_units() {
        let price = Money::vnd(Decimal::new(200_000, 0));
        assert_eq!(price.discounted(25).amount(), Decimal::new(150_000, 0));
        assert_eq!(price.discounted(150).amount(), Decimal::ZERO);
        assert_eq!(Money::vnd(Decimal::new(1000, 0)).minor_units(), 100_000);
    }

    #[test]
    fn test_quantity_positive() {
        assert!(Quantity::new(0).is_err());
        let q = Quantity::new(3).unwrap();
        assert_eq!(q.checked_add(Quantity::new(2).unwrap()).unwrap().value(), 5);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }
}
