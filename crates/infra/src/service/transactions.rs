use chrono::Utc;
use tracing::{info, instrument};

use ledgerdesk_banking::{
    MockBankAccount, NewBankAccount, NewTransaction, Transaction, TransactionFilter,
};
use ledgerdesk_core::{AccountId, TenantId, TransactionId};

use super::{Books, BooksResult};
use crate::store::{Page, Pagination};

impl Books {
    #[instrument(skip(self, new), fields(tenant_id = %tenant_id))]
    pub async fn create_account(&self, tenant_id: TenantId, new: NewBankAccount) -> BooksResult<MockBankAccount> {
        let account = MockBankAccount::open(tenant_id, new, Utc::now())?;
        let account = self.store.insert_account(account).await?;
        info!(account_id = %account.id, "bank account opened");
        Ok(account)
    }

    pub async fn get_account(&self, tenant_id: TenantId, id: AccountId) -> BooksResult<MockBankAccount> {
        Ok(self.store.get_account(tenant_id, id).await?)
    }

    pub async fn list_accounts(&self, tenant_id: TenantId) -> BooksResult<Vec<MockBankAccount>> {
        Ok(self.store.list_accounts(tenant_id).await?)
    }

    /// Record a transaction and move its account balance in one step.
    #[instrument(skip(self, new), fields(tenant_id = %tenant_id, account_id = %new.account_id))]
    pub async fn create_transaction(&self, tenant_id: TenantId, new: NewTransaction) -> BooksResult<Transaction> {
        let transaction = Transaction::record(tenant_id, new, Utc::now());
        let transaction = self.store.create_transaction(transaction).await?;
        info!(
            transaction_id = %transaction.id,
            kind = %transaction.kind,
            amount = %transaction.amount,
            "transaction recorded"
        );
        Ok(transaction)
    }

    /// Delete a transaction and restore its account balance.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, transaction_id = %id))]
    pub async fn delete_transaction(&self, tenant_id: TenantId, id: TransactionId) -> BooksResult<Transaction> {
        let transaction = self.store.delete_transaction(tenant_id, id).await?;
        info!(account_id = %transaction.account_id, "transaction deleted");
        Ok(transaction)
    }

    pub async fn get_transaction(&self, tenant_id: TenantId, id: TransactionId) -> BooksResult<Transaction> {
        Ok(self.store.get_transaction(tenant_id, id).await?)
    }

    pub async fn list_transactions(
        &self,
        tenant_id: TenantId,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> BooksResult<Page<Transaction>> {
        Ok(self.store.query_transactions(tenant_id, filter, pagination).await?)
    }
}
