//! Errors raised by domain rules.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A rule violation or a lookup miss inside one tenant's books.
///
/// Storage and transport failures are not represented here; callers wrap
/// them in their own error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input or an unbalanced voucher.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Missing, or owned by another tenant. The two are indistinguishable.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate voucher number, a state transition that is not allowed,
    /// or a ledger that vouchers still reference.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// `what` names the missing thing, e.g. `"voucher 0191..."`.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_the_kind() {
        assert_eq!(DomainError::not_found("ledger 'Cash'").to_string(), "not found: ledger 'Cash'");
        assert_eq!(DomainError::validation("debits != credits").to_string(), "validation failed: debits != credits");
        assert!(!DomainError::Unauthorized.is_not_found());
    }
}
