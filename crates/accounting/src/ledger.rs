use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::entity::TenantOwned;
use ledgerdesk_core::money::checked_add;
use ledgerdesk_core::{Amount, DomainError, DomainResult, Entity, LedgerId, TenantId};

use crate::entry::EntryType;
use crate::posting::{PostingDirection, signed_delta};

/// Natural balance side of a ledger (the side that increases it).
pub type BalanceSide = EntryType;

/// Ledger classification (determines the default natural balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerSubtype {
    Cash,
    Bank,
    Customer,
    Supplier,
    Income,
    Expense,
    FixedAsset,
    CurrentAsset,
    Liability,
    Capital,
    DutiesTaxes,
    Loan,
}

impl LedgerSubtype {
    pub const ALL: [LedgerSubtype; 12] = [
        LedgerSubtype::Cash,
        LedgerSubtype::Bank,
        LedgerSubtype::Customer,
        LedgerSubtype::Supplier,
        LedgerSubtype::Income,
        LedgerSubtype::Expense,
        LedgerSubtype::FixedAsset,
        LedgerSubtype::CurrentAsset,
        LedgerSubtype::Liability,
        LedgerSubtype::Capital,
        LedgerSubtype::DutiesTaxes,
        LedgerSubtype::Loan,
    ];

    /// Assets and expenses are debit-natured; liabilities, equity and income
    /// are credit-natured.
    pub fn natural_side(self) -> BalanceSide {
        match self {
            LedgerSubtype::Cash
            | LedgerSubtype::Bank
            | LedgerSubtype::Customer
            | LedgerSubtype::Expense
            | LedgerSubtype::FixedAsset
            | LedgerSubtype::CurrentAsset => EntryType::Debit,
            LedgerSubtype::Supplier
            | LedgerSubtype::Income
            | LedgerSubtype::Liability
            | LedgerSubtype::Capital
            | LedgerSubtype::DutiesTaxes
            | LedgerSubtype::Loan => EntryType::Credit,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LedgerSubtype::Cash => "CASH",
            LedgerSubtype::Bank => "BANK",
            LedgerSubtype::Customer => "CUSTOMER",
            LedgerSubtype::Supplier => "SUPPLIER",
            LedgerSubtype::Income => "INCOME",
            LedgerSubtype::Expense => "EXPENSE",
            LedgerSubtype::FixedAsset => "FIXED_ASSET",
            LedgerSubtype::CurrentAsset => "CURRENT_ASSET",
            LedgerSubtype::Liability => "LIABILITY",
            LedgerSubtype::Capital => "CAPITAL",
            LedgerSubtype::DutiesTaxes => "DUTIES_TAXES",
            LedgerSubtype::Loan => "LOAN",
        }
    }

    pub fn is_party(self) -> bool {
        matches!(self, LedgerSubtype::Customer | LedgerSubtype::Supplier)
    }
}

impl core::fmt::Display for LedgerSubtype {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for LedgerSubtype {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        LedgerSubtype::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("unknown ledger subtype '{s}'")))
    }
}

/// Case- and whitespace-insensitive lookup key for ledger names.
pub fn name_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Request to open a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedger {
    pub name: String,
    pub code: Option<String>,
    pub subtype: LedgerSubtype,
    /// Defaults to the subtype's natural side.
    pub balance_type: Option<BalanceSide>,
    pub opening_balance: Decimal,
    pub gstin: Option<String>,
}

impl NewLedger {
    pub fn new(name: impl Into<String>, subtype: LedgerSubtype, opening_balance: Decimal) -> Self {
        Self {
            name: name.into(),
            code: None,
            subtype,
            balance_type: None,
            opening_balance,
            gstin: None,
        }
    }
}

/// A named account with a running balance, owned by a tenant.
///
/// `current_balance` is expressed on the ledger's natural side: a positive
/// balance on a CREDIT-natured ledger is a credit balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub id: LedgerId,
    pub tenant_id: TenantId,
    pub name: String,
    pub code: Option<String>,
    pub subtype: LedgerSubtype,
    pub balance_type: BalanceSide,
    pub opening_balance: Decimal,
    pub current_balance: Decimal,
    pub gstin: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Ledger {
    pub fn open(tenant_id: TenantId, new: NewLedger, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = new.name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            return Err(DomainError::validation("ledger name must not be empty"));
        }
        if name.chars().count() > 200 {
            return Err(DomainError::validation("ledger name must be at most 200 characters"));
        }

        let gstin = match new.gstin.map(|g| g.trim().to_ascii_uppercase()) {
            Some(g) if g.is_empty() => None,
            Some(g) if g.len() != 15 || !g.chars().all(|c| c.is_ascii_alphanumeric()) => {
                return Err(DomainError::validation(format!(
                    "GSTIN must be 15 alphanumeric characters (got '{g}')"
                )));
            }
            other => other,
        };

        Ok(Self {
            id: LedgerId::new(),
            tenant_id,
            name,
            code: new.code.filter(|c| !c.trim().is_empty()),
            subtype: new.subtype,
            balance_type: new.balance_type.unwrap_or_else(|| new.subtype.natural_side()),
            opening_balance: new.opening_balance,
            current_balance: new.opening_balance,
            gstin,
            created_at: now,
        })
    }

    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    /// Signed effect of an entry on this ledger's balance.
    pub fn delta_for(&self, entry_type: EntryType, amount: Amount, direction: PostingDirection) -> Decimal {
        signed_delta(self.balance_type, entry_type, amount.value(), direction)
    }

    /// Balance after `delta`, without changing the ledger.
    pub fn balance_after(&self, delta: Decimal) -> DomainResult<Decimal> {
        checked_add(self.current_balance, delta)
    }

    /// Relative increment; never a read-modify-write from the outside.
    pub fn apply_delta(&mut self, delta: Decimal) -> DomainResult<()> {
        self.current_balance = self.balance_after(delta)?;
        Ok(())
    }
}

impl Entity for Ledger {
    type Id = LedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for Ledger {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cash(opening: i64) -> Ledger {
        Ledger::open(
            TenantId::new(),
            NewLedger::new("Cash", LedgerSubtype::Cash, Decimal::from(opening)),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn balance_type_defaults_from_subtype() {
        assert_eq!(cash(0).balance_type, EntryType::Debit);

        let sales = Ledger::open(
            TenantId::new(),
            NewLedger::new("Sales", LedgerSubtype::Income, Decimal::ZERO),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(sales.balance_type, EntryType::Credit);
    }

    #[test]
    fn debit_increases_debit_natured_ledger() {
        let mut l = cash(1000);
        let amount = Amount::new(Decimal::from(500)).unwrap();
        l.apply_delta(l.delta_for(EntryType::Debit, amount, PostingDirection::Apply)).unwrap();
        assert_eq!(l.current_balance, Decimal::from(1500));
        l.apply_delta(l.delta_for(EntryType::Debit, amount, PostingDirection::Revert)).unwrap();
        assert_eq!(l.current_balance, Decimal::from(1000));
    }

    #[test]
    fn balance_overflow_leaves_ledger_unchanged() {
        let mut l = cash(1);
        let err = l.apply_delta(Decimal::MAX).unwrap_err();
        assert_eq!(err, DomainError::validation("amount out of range"));
        assert_eq!(l.current_balance, Decimal::ONE);
    }

    #[test]
    fn name_is_trimmed_and_key_is_case_insensitive() {
        let l = Ledger::open(
            TenantId::new(),
            NewLedger::new("  Petty   Cash ", LedgerSubtype::Cash, Decimal::ZERO),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(l.name, "Petty Cash");
        assert_eq!(l.name_key(), name_key("PETTY cash"));
    }

    #[test]
    fn empty_name_and_bad_gstin_are_rejected() {
        let empty = NewLedger::new("   ", LedgerSubtype::Cash, Decimal::ZERO);
        assert!(Ledger::open(TenantId::new(), empty, Utc::now()).is_err());

        let mut bad = NewLedger::new("Acme", LedgerSubtype::Customer, Decimal::ZERO);
        bad.gstin = Some("123".into());
        assert!(Ledger::open(TenantId::new(), bad, Utc::now()).is_err());
    }

    #[test]
    fn subtype_parses_loose_spellings() {
        assert_eq!("duties taxes".parse::<LedgerSubtype>().unwrap(), LedgerSubtype::DutiesTaxes);
        assert_eq!("fixed-asset".parse::<LedgerSubtype>().unwrap(), LedgerSubtype::FixedAsset);
        assert!("widgets".parse::<LedgerSubtype>().is_err());
    }
}
