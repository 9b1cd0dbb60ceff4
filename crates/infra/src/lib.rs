//! Infrastructure layer: stores, the books service and Tally interchange.

pub mod service;
pub mod store;
pub mod tally;

pub use service::{Books, BooksError, BooksResult, EditDraft, PostVoucher};
pub use store::{BookStore, InMemoryBookStore, Page, Pagination, PostgresBookStore, StoreError, VoucherFilter};

#[cfg(test)]
mod integration_tests;
