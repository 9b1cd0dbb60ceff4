//! Shared primitives for the LedgerDesk crates: typed ids, money, the
//! domain error, and the entity/value-object markers.
//!
//! Nothing here touches storage or HTTP.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    AccountId, CostCategoryId, CostCenterId, LedgerId, NumberingSeriesId, TenantId,
    TransactionId, VoucherId,
};
pub use money::Amount;
pub use value_object::ValueObject;
