//! Application service over a `BookStore`.
//!
//! `Books` owns the workflow around each store call: input validation
//! before any read, ledger-name resolution, numbering choice, and logging.
//! Atomicity is the store's job; a failure here happens before the store
//! is asked to write anything.

use std::sync::Arc;

use thiserror::Error;

use ledgerdesk_accounting::EntryValidationError;
use ledgerdesk_core::DomainError;

use crate::store::{BookStore, StoreError};

mod ledgers;
mod transactions;
mod vouchers;

pub use vouchers::{EditDraft, PostVoucher};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BooksError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type BooksResult<T> = Result<T, BooksError>;

impl BooksError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BooksError::Domain(DomainError::NotFound(_)))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, BooksError::Domain(DomainError::Conflict(_)))
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BooksError::Domain(DomainError::Validation(_) | DomainError::InvalidId(_))
        )
    }
}

impl From<StoreError> for BooksError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => BooksError::Domain(DomainError::NotFound(msg)),
            StoreError::Conflict(msg) => BooksError::Domain(DomainError::Conflict(msg)),
            StoreError::Invalid(msg) => BooksError::Domain(DomainError::Validation(msg)),
            StoreError::Backend(msg) => BooksError::Internal(msg),
        }
    }
}

impl From<EntryValidationError> for BooksError {
    fn from(err: EntryValidationError) -> Self {
        BooksError::Domain(err.into())
    }
}

/// Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct Books {
    store: Arc<dyn BookStore>,
}

impl Books {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(crate::store::InMemoryBookStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn BookStore> {
        &self.store
    }
}

impl core::fmt::Debug for Books {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Books").finish_non_exhaustive()
    }
}
