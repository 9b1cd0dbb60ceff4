//! Banking domain module (mock bank accounts and single-entry transactions).
//!
//! Pure domain logic: no IO, no HTTP, no storage. Stores apply the deltas
//! computed here inside their own transactions.

pub mod account;
pub mod transaction;

pub use account::{MockBankAccount, NewBankAccount};
pub use transaction::{NewTransaction, Transaction, TransactionFilter, TransactionType};
