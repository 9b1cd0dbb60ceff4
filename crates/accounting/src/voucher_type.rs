//! Voucher type catalog.
//!
//! Voucher types are a fixed table (the same for every tenant); the category
//! code doubles as the voucher type id on the wire.

use serde::{Deserialize, Serialize};

use ledgerdesk_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoucherCategory {
    Payment,
    Receipt,
    Contra,
    Sales,
    Purchase,
    Journal,
    DebitNote,
    CreditNote,
}

impl VoucherCategory {
    pub const ALL: [VoucherCategory; 8] = [
        VoucherCategory::Payment,
        VoucherCategory::Receipt,
        VoucherCategory::Contra,
        VoucherCategory::Sales,
        VoucherCategory::Purchase,
        VoucherCategory::Journal,
        VoucherCategory::DebitNote,
        VoucherCategory::CreditNote,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VoucherCategory::Payment => "PAYMENT",
            VoucherCategory::Receipt => "RECEIPT",
            VoucherCategory::Contra => "CONTRA",
            VoucherCategory::Sales => "SALES",
            VoucherCategory::Purchase => "PURCHASE",
            VoucherCategory::Journal => "JOURNAL",
            VoucherCategory::DebitNote => "DEBIT_NOTE",
            VoucherCategory::CreditNote => "CREDIT_NOTE",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            VoucherCategory::Payment => "Payment",
            VoucherCategory::Receipt => "Receipt",
            VoucherCategory::Contra => "Contra",
            VoucherCategory::Sales => "Sales",
            VoucherCategory::Purchase => "Purchase",
            VoucherCategory::Journal => "Journal",
            VoucherCategory::DebitNote => "Debit Note",
            VoucherCategory::CreditNote => "Credit Note",
        }
    }

    /// Prefix for automatically numbered vouchers.
    pub fn abbreviation(self) -> &'static str {
        match self {
            VoucherCategory::Payment => "PMT",
            VoucherCategory::Receipt => "RCT",
            VoucherCategory::Contra => "CTR",
            VoucherCategory::Sales => "SAL",
            VoucherCategory::Purchase => "PUR",
            VoucherCategory::Journal => "JRN",
            VoucherCategory::DebitNote => "DBN",
            VoucherCategory::CreditNote => "CRN",
        }
    }

    /// Whether vouchers of this type appear in GST returns.
    pub fn affects_gst(self) -> bool {
        matches!(
            self,
            VoucherCategory::Sales
                | VoucherCategory::Purchase
                | VoucherCategory::DebitNote
                | VoucherCategory::CreditNote
        )
    }
}

impl core::fmt::Display for VoucherCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for VoucherCategory {
    type Err = DomainError;

    /// Accepts the code (`DEBIT_NOTE`) or the display name (`Debit Note`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        VoucherCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("unknown voucher type '{s}'")))
    }
}

/// Catalog row returned by `GET /vouchers/types`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoucherType {
    pub id: VoucherCategory,
    pub name: &'static str,
    pub abbreviation: &'static str,
    pub category: VoucherCategory,
    pub affects_gst: bool,
}

impl VoucherType {
    pub fn of(category: VoucherCategory) -> Self {
        Self {
            id: category,
            name: category.display_name(),
            abbreviation: category.abbreviation(),
            category,
            affects_gst: category.affects_gst(),
        }
    }

    pub fn catalog() -> Vec<VoucherType> {
        VoucherCategory::ALL.into_iter().map(VoucherType::of).collect()
    }
}
