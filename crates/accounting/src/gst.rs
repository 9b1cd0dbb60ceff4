//! GST computation (Indian goods and services tax).
//!
//! Intra-state supplies split the rate evenly into CGST and SGST; inter-state
//! supplies carry the full rate as IGST. Every tax component is rounded to
//! paise, midpoint away from zero.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use ledgerdesk_core::money::{checked_add, checked_mul, checked_sub};
use ledgerdesk_core::{DomainError, DomainResult, ValueObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplyKind {
    IntraState,
    InterState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstBreakdown {
    pub taxable_value: Decimal,
    pub rate: Decimal,
    pub supply: SupplyKind,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total_tax: Decimal,
    pub total: Decimal,
}

impl ValueObject for GstBreakdown {}

/// Statutory slabs, in percent.
fn slabs() -> [Decimal; 7] {
    [
        Decimal::ZERO,
        Decimal::new(25, 2),
        Decimal::from(3),
        Decimal::from(5),
        Decimal::from(12),
        Decimal::from(18),
        Decimal::from(28),
    ]
}

fn paise(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn check_rate(rate: Decimal) -> DomainResult<()> {
    if slabs().contains(&rate) {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "GST rate {rate}% is not a statutory slab (0, 0.25, 3, 5, 12, 18, 28)"
        )))
    }
}

/// Tax on a tax-exclusive taxable value.
pub fn compute_gst(taxable_value: Decimal, rate: Decimal, supply: SupplyKind) -> DomainResult<GstBreakdown> {
    check_rate(rate)?;
    if taxable_value < Decimal::ZERO {
        return Err(DomainError::validation("taxable value must not be negative"));
    }

    // Divide first: the largest slab keeps the result well inside range.
    let tax = checked_mul(taxable_value / Decimal::ONE_HUNDRED, rate)?;
    let (cgst, sgst, igst) = match supply {
        SupplyKind::IntraState => {
            let half = paise(tax / Decimal::TWO);
            (half, half, Decimal::ZERO)
        }
        SupplyKind::InterState => (Decimal::ZERO, Decimal::ZERO, paise(tax)),
    };

    let total_tax = checked_add(checked_add(cgst, sgst)?, igst)?;
    Ok(GstBreakdown {
        taxable_value,
        rate,
        supply,
        cgst,
        sgst,
        igst,
        total_tax,
        total: checked_add(taxable_value, total_tax)?,
    })
}

/// Back out the taxable value from a tax-inclusive amount.
///
/// The taxable value absorbs rounding so `total` equals `gross` exactly.
pub fn from_inclusive(gross: Decimal, rate: Decimal, supply: SupplyKind) -> DomainResult<GstBreakdown> {
    check_rate(rate)?;
    if gross < Decimal::ZERO {
        return Err(DomainError::validation("gross amount must not be negative"));
    }

    let hundred = Decimal::ONE_HUNDRED;
    let estimate = paise(checked_mul(gross / (hundred + rate), hundred)?);
    let mut breakdown = compute_gst(estimate, rate, supply)?;
    breakdown.taxable_value = checked_sub(gross, breakdown.total_tax)?;
    breakdown.total = gross;
    Ok(breakdown)
}
