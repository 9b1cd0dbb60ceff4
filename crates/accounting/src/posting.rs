//! Posting sign convention and per-ledger balance deltas.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::money::checked_add;
use ledgerdesk_core::{DomainError, DomainResult, LedgerId};

use crate::entry::{EntryType, VoucherEntry};
use crate::ledger::BalanceSide;

/// Whether a voucher's effect is being applied (post) or undone (reversal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostingDirection {
    Apply,
    Revert,
}

/// Signed balance effect of one entry on a ledger.
///
/// An entry on the ledger's natural side increases its balance, the opposite
/// side decreases it. `Revert` is the exact negation of `Apply`.
pub fn signed_delta(
    natural: BalanceSide,
    entry_type: EntryType,
    amount: Decimal,
    direction: PostingDirection,
) -> Decimal {
    let applied = if entry_type == natural { amount } else { -amount };
    match direction {
        PostingDirection::Apply => applied,
        PostingDirection::Revert => -applied,
    }
}

/// Net balance change for one ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub ledger_id: LedgerId,
    pub delta: Decimal,
}

/// Collapse a voucher's entries into one delta per ledger.
///
/// `side_of` returns the natural side of a ledger, or `None` when the ledger
/// no longer exists (reported as `NotFound`). Output keeps first-appearance
/// order so stores touch ledgers deterministically.
pub fn balance_deltas<F>(
    entries: &[VoucherEntry],
    direction: PostingDirection,
    mut side_of: F,
) -> DomainResult<Vec<BalanceDelta>>
where
    F: FnMut(LedgerId) -> Option<BalanceSide>,
{
    let mut out: Vec<BalanceDelta> = Vec::with_capacity(entries.len());

    for entry in entries {
        let side = side_of(entry.ledger_id)
            .ok_or_else(|| DomainError::not_found(format!("ledger '{}'", entry.ledger_name)))?;
        let delta = signed_delta(side, entry.entry_type, entry.amount.value(), direction);

        match out.iter_mut().find(|d| d.ledger_id == entry.ledger_id) {
            Some(existing) => existing.delta = checked_add(existing.delta, delta)?,
            None => out.push(BalanceDelta {
                ledger_id: entry.ledger_id,
                delta,
            }),
        }
    }

    Ok(out)
}
