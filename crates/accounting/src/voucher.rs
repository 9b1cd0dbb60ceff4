//! Vouchers and their lifecycle.
//!
//! ```text
//! DRAFT --post--> POSTED --reverse--> REVERSED
//!   |
//!   +--delete--> (gone)
//! ```
//!
//! Only POSTED vouchers affect ledger balances. A DRAFT can be edited or
//! discarded freely; POSTED only moves to REVERSED; REVERSED is terminal.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::entity::TenantOwned;
use ledgerdesk_core::{DomainError, DomainResult, Entity, LedgerId, NumberingSeriesId, TenantId, VoucherId};

use crate::entry::{EntryType, VoucherEntry};
use crate::numbering::NumberScope;
use crate::validation::validate_entries;
use crate::voucher_type::VoucherCategory;

const MAX_NUMBER_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherStatus {
    Draft,
    Posted,
    Reversed,
}

impl VoucherStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VoucherStatus::Draft => "DRAFT",
            VoucherStatus::Posted => "POSTED",
            VoucherStatus::Reversed => "REVERSED",
        }
    }
}

impl core::fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for VoucherStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(VoucherStatus::Draft),
            "POSTED" => Ok(VoucherStatus::Posted),
            "REVERSED" => Ok(VoucherStatus::Reversed),
            other => Err(DomainError::validation(format!("unknown voucher status '{other}'"))),
        }
    }
}

/// What deleting a voucher means in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoucherDeletion {
    /// Remove the draft; no balance effect.
    DiscardDraft,
    /// Undo the posted balance effect and mark the voucher REVERSED.
    ReversePosted,
}

/// How the store should number a new voucher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoucherNumbering {
    /// Caller-supplied number, unique within the series (if any) or type.
    Manual {
        number: String,
        series: Option<NumberingSeriesId>,
    },
    /// Next number of the series.
    Series(NumberingSeriesId),
    /// Next value of the tenant's per-type counter (`ABBR-n`).
    Auto,
}

impl VoucherNumbering {
    pub fn manual(number: impl Into<String>, series: Option<NumberingSeriesId>) -> DomainResult<Self> {
        let number = number.into().trim().to_string();
        if number.is_empty() {
            return Err(DomainError::validation("voucher number must not be empty"));
        }
        if number.len() > MAX_NUMBER_LEN {
            return Err(DomainError::validation(format!(
                "voucher number must be at most {MAX_NUMBER_LEN} characters"
            )));
        }
        Ok(VoucherNumbering::Manual { number, series })
    }

    pub fn series(&self) -> Option<NumberingSeriesId> {
        match self {
            VoucherNumbering::Manual { series, .. } => *series,
            VoucherNumbering::Series(id) => Some(*id),
            VoucherNumbering::Auto => None,
        }
    }

    pub fn scope(&self, voucher_type: VoucherCategory) -> NumberScope {
        match self.series() {
            Some(id) => NumberScope::Series(id),
            None => NumberScope::VoucherType(voucher_type),
        }
    }
}

/// A validated, ledger-resolved voucher waiting for a number from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVoucher {
    pub id: VoucherId,
    pub tenant_id: TenantId,
    pub voucher_type: VoucherCategory,
    pub numbering: VoucherNumbering,
    pub date: NaiveDate,
    pub reference: Option<String>,
    pub narration: Option<String>,
    pub total_amount: Decimal,
    pub entries: Vec<VoucherEntry>,
    pub party_ledger_id: Option<LedgerId>,
    /// DRAFT or POSTED; never REVERSED.
    pub status: VoucherStatus,
}

impl NewVoucher {
    pub fn number_scope(&self) -> NumberScope {
        self.numbering.scope(self.voucher_type)
    }

    pub fn into_voucher(self, voucher_number: String, now: DateTime<Utc>) -> Voucher {
        Voucher {
            id: self.id,
            tenant_id: self.tenant_id,
            voucher_number,
            voucher_type: self.voucher_type,
            numbering_series_id: self.numbering.series(),
            date: self.date,
            reference: self.reference,
            narration: self.narration,
            total_amount: self.total_amount,
            entries: self.entries,
            party_ledger_id: self.party_ledger_id,
            status: self.status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Replacement content for a DRAFT voucher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRevision {
    pub date: NaiveDate,
    pub reference: Option<String>,
    pub narration: Option<String>,
    pub party_ledger_id: Option<LedgerId>,
    pub entries: Vec<VoucherEntry>,
    pub total_amount: Decimal,
}

/// A balanced set of entries representing one accounting event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub tenant_id: TenantId,
    pub voucher_number: String,
    pub voucher_type: VoucherCategory,
    pub numbering_series_id: Option<NumberingSeriesId>,
    pub date: NaiveDate,
    pub reference: Option<String>,
    pub narration: Option<String>,
    pub total_amount: Decimal,
    pub entries: Vec<VoucherEntry>,
    pub party_ledger_id: Option<LedgerId>,
    pub status: VoucherStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    /// `None` when the side does not fit in a `Decimal`.
    pub fn side_total(&self, side: EntryType) -> Option<Decimal> {
        self.entries
            .iter()
            .filter(|e| e.entry_type == side)
            .try_fold(Decimal::ZERO, |acc, e| acc.checked_add(e.amount.value()))
    }

    /// Σ debits == Σ credits == total_amount.
    pub fn is_balanced(&self) -> bool {
        match validate_entries(&self.entries) {
            Ok(total) => total == self.total_amount,
            Err(_) => false,
        }
    }

    pub fn affects_balances(&self) -> bool {
        self.status == VoucherStatus::Posted
    }

    pub fn references_ledger(&self, ledger_id: LedgerId) -> bool {
        self.party_ledger_id == Some(ledger_id)
            || self.entries.iter().any(|e| e.ledger_id == ledger_id)
    }

    pub fn number_scope(&self) -> NumberScope {
        match self.numbering_series_id {
            Some(id) => NumberScope::Series(id),
            None => NumberScope::VoucherType(self.voucher_type),
        }
    }

    pub fn ensure_can_post(&self) -> DomainResult<()> {
        match self.status {
            VoucherStatus::Draft => Ok(()),
            VoucherStatus::Reversed => Err(DomainError::not_found(format!("voucher {}", self.id))),
            VoucherStatus::Posted => Err(DomainError::conflict(format!(
                "voucher {} is already posted",
                self.voucher_number
            ))),
        }
    }

    pub fn ensure_can_edit(&self) -> DomainResult<()> {
        match self.status {
            VoucherStatus::Draft => Ok(()),
            VoucherStatus::Reversed => Err(DomainError::not_found(format!("voucher {}", self.id))),
            VoucherStatus::Posted => Err(DomainError::conflict(format!(
                "voucher {} is posted; reverse it instead of editing",
                self.voucher_number
            ))),
        }
    }

    /// A REVERSED voucher is gone as far as deletion is concerned, which is
    /// what makes a second delete fail instead of reversing twice.
    pub fn deletion(&self) -> DomainResult<VoucherDeletion> {
        match self.status {
            VoucherStatus::Draft => Ok(VoucherDeletion::DiscardDraft),
            VoucherStatus::Posted => Ok(VoucherDeletion::ReversePosted),
            VoucherStatus::Reversed => Err(DomainError::not_found(format!("voucher {}", self.id))),
        }
    }

    pub fn mark_posted(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_can_post()?;
        self.status = VoucherStatus::Posted;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_reversed(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.deletion()? != VoucherDeletion::ReversePosted {
            return Err(DomainError::conflict(format!(
                "voucher {} is a draft; delete it instead of reversing",
                self.voucher_number
            )));
        }
        self.status = VoucherStatus::Reversed;
        self.updated_at = now;
        Ok(())
    }

    pub fn revise_draft(&mut self, revision: DraftRevision, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_can_edit()?;
        self.date = revision.date;
        self.reference = revision.reference;
        self.narration = revision.narration;
        self.party_ledger_id = revision.party_ledger_id;
        self.entries = revision.entries;
        self.total_amount = revision.total_amount;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Voucher {
    type Id = VoucherId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for Voucher {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
