use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::{Amount, CostCategoryId, CostCenterId, DomainError, LedgerId, ValueObject};

/// Side of a voucher entry (also used as a ledger's natural balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    pub fn opposite(self) -> Self {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Debit => "DEBIT",
            EntryType::Credit => "CREDIT",
        }
    }
}

impl core::fmt::Display for EntryType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for EntryType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBIT" | "DR" | "D" => Ok(EntryType::Debit),
            "CREDIT" | "CR" | "C" => Ok(EntryType::Credit),
            other => Err(DomainError::validation(format!(
                "entry type must be DEBIT or CREDIT (got '{other}')"
            ))),
        }
    }
}

/// Anything the balancing validator can sum.
pub trait EntryLine {
    fn entry_type(&self) -> EntryType;
    fn amount(&self) -> Decimal;
}

/// An entry as submitted by a caller, before ledger resolution.
///
/// `amount` is a raw decimal so the validator can report non-positive values
/// per line instead of failing at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedEntry {
    pub ledger_name: String,
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub ledger_code: Option<String>,
    pub narration: Option<String>,
    pub cost_center_id: Option<CostCenterId>,
    pub cost_category_id: Option<CostCategoryId>,
}

impl ProposedEntry {
    pub fn new(ledger_name: impl Into<String>, entry_type: EntryType, amount: Decimal) -> Self {
        Self {
            ledger_name: ledger_name.into(),
            entry_type,
            amount,
            ledger_code: None,
            narration: None,
            cost_center_id: None,
            cost_category_id: None,
        }
    }

    pub fn debit(ledger_name: impl Into<String>, amount: Decimal) -> Self {
        Self::new(ledger_name, EntryType::Debit, amount)
    }

    pub fn credit(ledger_name: impl Into<String>, amount: Decimal) -> Self {
        Self::new(ledger_name, EntryType::Credit, amount)
    }

    /// Bind this entry to a resolved ledger.
    ///
    /// Only call after validation: the amount must already be positive.
    pub fn resolve(
        self,
        line_no: u32,
        ledger_id: LedgerId,
        ledger_name: String,
    ) -> Result<VoucherEntry, DomainError> {
        Ok(VoucherEntry {
            line_no,
            ledger_id,
            ledger_name,
            ledger_code: self.ledger_code,
            entry_type: self.entry_type,
            amount: Amount::new(self.amount)?,
            narration: self.narration,
            cost_center_id: self.cost_center_id,
            cost_category_id: self.cost_category_id,
        })
    }
}

impl EntryLine for ProposedEntry {
    fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    fn amount(&self) -> Decimal {
        self.amount
    }
}

/// One line of a voucher, bound to a ledger (immutable once posted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherEntry {
    pub line_no: u32,
    pub ledger_id: LedgerId,
    pub ledger_name: String,
    pub ledger_code: Option<String>,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub narration: Option<String>,
    pub cost_center_id: Option<CostCenterId>,
    pub cost_category_id: Option<CostCategoryId>,
}

impl EntryLine for VoucherEntry {
    fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    fn amount(&self) -> Decimal {
        self.amount.value()
    }
}

impl ValueObject for VoucherEntry {}
