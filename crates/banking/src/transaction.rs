//! Single-entry transactions against a mock bank account.
//!
//! A CREDIT adds its amount to the account balance, a DEBIT subtracts it.
//! Deleting a transaction applies the inverse delta.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::entity::TenantOwned;
use ledgerdesk_core::{AccountId, Amount, DomainError, Entity, TenantId, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
        }
    }

    /// Balance change when the transaction is recorded.
    pub fn signed_delta(self, amount: Amount) -> Decimal {
        match self {
            TransactionType::Credit => amount.value(),
            TransactionType::Debit => -amount.value(),
        }
    }

    /// Balance change when the transaction is deleted.
    pub fn inverse_delta(self, amount: Amount) -> Decimal {
        -self.signed_delta(amount)
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREDIT" => Ok(TransactionType::Credit),
            "DEBIT" => Ok(TransactionType::Debit),
            other => Err(DomainError::validation(format!(
                "transaction type must be CREDIT or DEBIT (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub amount: Amount,
    pub kind: TransactionType,
    pub description: String,
    /// Defaults to the time of recording.
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub tenant_id: TenantId,
    pub account_id: AccountId,
    pub amount: Amount,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub description: String,
    pub date: DateTime<Utc>,
}

impl Transaction {
    pub fn record(tenant_id: TenantId, new: NewTransaction, now: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::new(),
            tenant_id,
            account_id: new.account_id,
            amount: new.amount,
            kind: new.kind,
            description: new.description.trim().to_string(),
            date: new.date.unwrap_or(now),
        }
    }

    pub fn balance_delta(&self) -> Decimal {
        self.kind.signed_delta(self.amount)
    }

    pub fn reversal_delta(&self) -> Decimal {
        self.kind.inverse_delta(self.amount)
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for Transaction {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Optional predicates for listing transactions; all present ones must hold.
///
/// `start_date` and `end_date` are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub account_id: Option<AccountId>,
    pub kind: Option<TransactionType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.account_id.is_none_or(|id| tx.account_id == id)
            && self.kind.is_none_or(|k| tx.kind == k)
            && self.start_date.is_none_or(|start| tx.date >= start)
            && self.end_date.is_none_or(|end| tx.date <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn amount(v: i64) -> Amount {
        Amount::new(Decimal::from(v)).unwrap()
    }

    fn tx(kind: TransactionType, day: u32) -> Transaction {
        Transaction::record(
            TenantId::new(),
            NewTransaction {
                account_id: AccountId::new(),
                amount: amount(200),
                kind,
                description: " rent ".into(),
                date: Some(Utc.with_ymd_and_hms(2026, 3, day, 0, 0, 0).unwrap()),
            },
            Utc::now(),
        )
    }

    #[test]
    fn debit_reduces_and_credit_increases() {
        assert_eq!(TransactionType::Debit.signed_delta(amount(200)), Decimal::from(-200));
        assert_eq!(TransactionType::Credit.signed_delta(amount(200)), Decimal::from(200));
    }

    #[test]
    fn record_trims_description_and_keeps_date() {
        let t = tx(TransactionType::Debit, 5);
        assert_eq!(t.description, "rent");
        assert_eq!(t.date, Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn serializes_kind_as_type() {
        let json = serde_json::to_value(tx(TransactionType::Credit, 1)).unwrap();
        assert_eq!(json["type"], "CREDIT");
        assert_eq!(json["amount"], "200");
    }

    #[test]
    fn filter_bounds_are_inclusive() {
        let t = tx(TransactionType::Debit, 10);
        let on_the_day = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();

        let filter = TransactionFilter {
            start_date: Some(on_the_day),
            end_date: Some(on_the_day),
            ..Default::default()
        };
        assert!(filter.matches(&t));

        let wrong_kind = TransactionFilter {
            kind: Some(TransactionType::Credit),
            ..Default::default()
        };
        assert!(!wrong_kind.matches(&t));
        assert!(!TransactionFilter { account_id: Some(AccountId::new()), ..Default::default() }.matches(&t));
    }

    proptest! {
        #[test]
        fn record_then_delete_nets_to_zero(cents in 1i64..10_000_000, credit in any::<bool>()) {
            let kind = if credit { TransactionType::Credit } else { TransactionType::Debit };
            let amount = Amount::new(Decimal::new(cents, 2)).unwrap();
            prop_assert_eq!(kind.signed_delta(amount) + kind.inverse_delta(amount), Decimal::ZERO);
        }
    }
}
