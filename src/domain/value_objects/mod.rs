//! Value Objects for the suit marketplace

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Money value object
///
/// Amounts are kept as exact decimals in the reference currency. Payment
/// providers want integer minor units; [`Money::to_minor_units`] and
/// [`Money::from_minor_units`] are the only crossing points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_lowercase() } }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_negative(&self) -> bool { self.amount.is_sign_negative() && !self.amount.is_zero() }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }

    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount - other.amount, &self.currency))
    }

    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }

    /// Scales by `rate` without rounding.
    pub fn scale(&self, rate: Decimal) -> Money { Money::new(self.amount * rate, &self.currency) }

    /// Rounds to whole currency units, half away from zero.
    pub fn round_units(&self) -> Money {
        Money::new(self.amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero), &self.currency)
    }

    /// Rounds to minor units (2 dp), half away from zero.
    pub fn round_minor(&self) -> Money {
        Money::new(self.amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero), &self.currency)
    }

    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(MoneyError::Overflow)
    }

    pub fn from_minor_units(units: i64, currency: &str) -> Money { Money::new(Decimal::new(units, 2), currency) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount, self.currency.to_uppercase()) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { CurrencyMismatch, Overflow }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::CurrencyMismatch => write!(f, "Currency mismatch"), Self::Overflow => write!(f, "Amount out of range") }
    }
}

/// Line-item quantity, always within `[Quantity::MIN, Quantity::MAX]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Quantity(u32);

impl Quantity {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 10;

    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if !(Self::MIN..=Self::MAX).contains(&value) { return Err(QuantityError::OutOfRange(value)); }
        Ok(Self(value))
    }
    pub fn one() -> Self { Self(1) }
    pub fn value(&self) -> u32 { self.0 }
}

impl Default for Quantity { fn default() -> Self { Self::one() } }

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { OutOfRange(u32) }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::OutOfRange(v) => write!(f, "quantity must be between {} and {}, got {v}", Quantity::MIN, Quantity::MAX) }
    }
}

/// Free-text notes on a cart item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notes(String);

impl Notes {
    pub const MAX_CHARS: usize = 500;

    /// Trims the input; blank notes become `None`.
    pub fn parse(value: impl Into<String>) -> Result<Option<Self>, TextError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Ok(None); }
        if value.chars().count() > Self::MAX_CHARS { return Err(TextError::TooLong { max: Self::MAX_CHARS }); }
        Ok(Some(Self(value)))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

/// Monogram initials stitched into the lining.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonogramText(String);

impl MonogramText {
    pub const MAX_CHARS: usize = 4;

    pub fn new(value: impl Into<String>) -> Result<Self, TextError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(TextError::Empty); }
        if value.chars().count() > Self::MAX_CHARS { return Err(TextError::TooLong { max: Self::MAX_CHARS }); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum TextError { Empty, TooLong { max: usize } }
impl std::error::Error for TextError {}
impl fmt::Display for TextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "must not be empty"), Self::TooLong { max } => write!(f, "must be at most {max} characters") }
    }
}
