//! Typed UUID identifiers.
//!
//! Each identifier is a transparent newtype over a UUIDv7, so ids sort by
//! creation time and serialize as plain UUID strings.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {e}", stringify!($name))))
            }
        }
    };
}

uuid_id!(
    /// Tenant boundary. Every stored row carries one.
    TenantId
);
uuid_id!(LedgerId);
uuid_id!(VoucherId);
uuid_id!(NumberingSeriesId);
uuid_id!(
    /// Mock bank account.
    AccountId
);
uuid_id!(TransactionId);
uuid_id!(CostCenterId);
uuid_id!(CostCategoryId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_names_the_identifier_kind() {
        let err = "not-a-uuid".parse::<VoucherId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) => assert!(msg.starts_with("VoucherId")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn display_parses_back() {
        let id = LedgerId::new();
        assert_eq!(id.to_string().parse::<LedgerId>().unwrap(), id);
        assert_eq!(format!(" {id} ").parse::<LedgerId>().unwrap(), id);
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let id = AccountId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }
}
