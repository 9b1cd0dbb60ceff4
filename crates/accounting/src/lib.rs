//! Accounting module (double-entry ledgers and vouchers).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns. Stores
//! call into this crate for the validator, the posting sign convention and
//! the voucher state machine, so every backend applies the same rules.

pub mod entry;
pub mod gst;
pub mod ledger;
pub mod numbering;
pub mod posting;
pub mod reconcile;
pub mod validation;
pub mod voucher;
pub mod voucher_type;

pub use entry::{EntryLine, EntryType, ProposedEntry, VoucherEntry};
pub use gst::{GstBreakdown, SupplyKind, compute_gst, from_inclusive};
pub use ledger::{BalanceSide, Ledger, LedgerSubtype, NewLedger, name_key};
pub use numbering::{NewNumberingSeries, NumberScope, NumberingSeries, auto_number};
pub use posting::{BalanceDelta, PostingDirection, balance_deltas, signed_delta};
pub use reconcile::{Reconciliation, reconcile};
pub use validation::{EntryValidationError, validate_entries};
pub use voucher::{
    DraftRevision, NewVoucher, Voucher, VoucherDeletion, VoucherNumbering, VoucherStatus,
};
pub use voucher_type::{VoucherCategory, VoucherType};
