//! Tenant-scoped persistence for ledgers, vouchers and bank accounts.
//!
//! ## Atomicity
//!
//! Every mutating method is one store transaction: all of its preconditions
//! (existence, status, uniqueness) are checked inside the same transaction
//! that writes, and a failed precondition leaves the store unchanged. Balance
//! changes are relative increments, never a read-modify-write by the caller.
//!
//! ## Tenant isolation
//!
//! Every method takes the tenant explicitly. A row owned by another tenant is
//! reported exactly like a missing row (`NotFound`).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use ledgerdesk_accounting::{
    DraftRevision, Ledger, NewVoucher, NumberingSeries, Voucher, VoucherDeletion,
};
use ledgerdesk_banking::{MockBankAccount, Transaction, TransactionFilter};
use ledgerdesk_core::{
    AccountId, DomainError, LedgerId, NumberingSeriesId, TenantId, TransactionId, VoucherId,
};

mod memory;
mod postgres;
mod query;
mod schema;

pub use memory::InMemoryBookStore;
pub use postgres::PostgresBookStore;
pub use query::{DEFAULT_LIMIT, MAX_LIMIT, Page, Pagination, VoucherFilter};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Rejected by a state rule or a database check constraint.
    #[error("invalid: {0}")]
    Invalid(String),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(msg) => StoreError::NotFound(msg),
            DomainError::Conflict(msg) => StoreError::Conflict(msg),
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => StoreError::Invalid(msg),
            DomainError::Unauthorized => StoreError::Invalid("unauthorized".to_string()),
        }
    }
}

/// Result of deleting a voucher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedVoucher {
    pub deletion: VoucherDeletion,
    /// The voucher as it stood after the operation (REVERSED when posted).
    pub voucher: Voucher,
}

#[async_trait]
pub trait BookStore: Send + Sync {
    // Ledgers

    /// Conflict when the tenant already has a ledger with the same name key.
    async fn insert_ledger(&self, ledger: Ledger) -> StoreResult<Ledger>;

    async fn get_ledger(&self, tenant_id: TenantId, id: LedgerId) -> StoreResult<Ledger>;

    /// Ledgers whose name key is in `keys` (see `ledgerdesk_accounting::name_key`).
    async fn find_ledgers_by_names(&self, tenant_id: TenantId, keys: &[String]) -> StoreResult<Vec<Ledger>>;

    /// Ordered by name.
    async fn list_ledgers(&self, tenant_id: TenantId) -> StoreResult<Vec<Ledger>>;

    /// Conflict while a DRAFT or POSTED voucher references the ledger.
    async fn delete_ledger(&self, tenant_id: TenantId, id: LedgerId) -> StoreResult<()>;

    // Numbering series

    async fn insert_series(&self, series: NumberingSeries) -> StoreResult<NumberingSeries>;

    async fn get_series(&self, tenant_id: TenantId, id: NumberingSeriesId) -> StoreResult<NumberingSeries>;

    async fn list_series(&self, tenant_id: TenantId) -> StoreResult<Vec<NumberingSeries>>;

    // Vouchers

    /// Allocate the number, enforce its uniqueness, insert, and apply balance
    /// deltas when the voucher is POSTED.
    async fn create_voucher(&self, voucher: NewVoucher) -> StoreResult<Voucher>;

    /// DRAFT -> POSTED, applying balance deltas.
    async fn post_draft(&self, tenant_id: TenantId, id: VoucherId) -> StoreResult<Voucher>;

    async fn replace_draft(
        &self,
        tenant_id: TenantId,
        id: VoucherId,
        revision: DraftRevision,
    ) -> StoreResult<Voucher>;

    /// Discard a DRAFT, or reverse a POSTED voucher. Missing or already
    /// REVERSED is `NotFound`.
    async fn delete_voucher(&self, tenant_id: TenantId, id: VoucherId) -> StoreResult<RemovedVoucher>;

    async fn get_voucher(&self, tenant_id: TenantId, id: VoucherId) -> StoreResult<Voucher>;

    /// Newest voucher date first.
    async fn list_vouchers(
        &self,
        tenant_id: TenantId,
        filter: &VoucherFilter,
        pagination: Pagination,
    ) -> StoreResult<Page<Voucher>>;

    // Mock bank accounts

    async fn insert_account(&self, account: MockBankAccount) -> StoreResult<MockBankAccount>;

    async fn get_account(&self, tenant_id: TenantId, id: AccountId) -> StoreResult<MockBankAccount>;

    async fn list_accounts(&self, tenant_id: TenantId) -> StoreResult<Vec<MockBankAccount>>;

    /// Insert and apply the transaction's delta to its account.
    async fn create_transaction(&self, transaction: Transaction) -> StoreResult<Transaction>;

    /// Apply the inverse delta and delete; returns the deleted row.
    async fn delete_transaction(&self, tenant_id: TenantId, id: TransactionId) -> StoreResult<Transaction>;

    async fn get_transaction(&self, tenant_id: TenantId, id: TransactionId) -> StoreResult<Transaction>;

    /// Newest first.
    async fn query_transactions(
        &self,
        tenant_id: TenantId,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> StoreResult<Page<Transaction>>;
}

pub type SharedBookStore = Arc<dyn BookStore>;
