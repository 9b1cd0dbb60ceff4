use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerdesk_core::entity::TenantOwned;
use ledgerdesk_core::money::checked_add;
use ledgerdesk_core::{AccountId, DomainError, DomainResult, Entity, TenantId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBankAccount {
    pub name: String,
    #[serde(default)]
    pub balance: Decimal,
}

/// A simulated bank account whose balance moves with its transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockBankAccount {
    pub id: AccountId,
    pub tenant_id: TenantId,
    pub name: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl MockBankAccount {
    pub fn open(tenant_id: TenantId, new: NewBankAccount, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("account name must not be empty"));
        }

        Ok(Self {
            id: AccountId::new(),
            tenant_id,
            name,
            balance: new.balance,
            created_at: now,
        })
    }

    /// Fails without touching the balance when the sum would overflow.
    pub fn apply_delta(&mut self, delta: Decimal) -> DomainResult<()> {
        self.balance = checked_add(self.balance, delta)?;
        Ok(())
    }
}

impl Entity for MockBankAccount {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for MockBankAccount {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
