//! Monetary amounts.
//!
//! All money is `rust_decimal::Decimal`: exact base-10 arithmetic, so sums of
//! entries compare with plain `==` and never drift by a cent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// A strictly positive monetary amount (entry or transaction amount).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "amount must be positive (got {value})"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl ValueObject for Amount {}

fn out_of_range() -> DomainError {
    DomainError::validation("amount out of range")
}

/// `lhs + rhs`, or a validation error where `Decimal` would overflow.
pub fn checked_add(lhs: Decimal, rhs: Decimal) -> DomainResult<Decimal> {
    lhs.checked_add(rhs).ok_or_else(out_of_range)
}

pub fn checked_sub(lhs: Decimal, rhs: Decimal) -> DomainResult<Decimal> {
    lhs.checked_sub(rhs).ok_or_else(out_of_range)
}

pub fn checked_mul(lhs: Decimal, rhs: Decimal) -> DomainResult<Decimal> {
    lhs.checked_mul(rhs).ok_or_else(out_of_range)
}
