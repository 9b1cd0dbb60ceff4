use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier (`"<area>.<action>"`).
///
/// `"*"` grants everything within the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: &'static str = "*";
    pub const LEDGERS_WRITE: &'static str = "ledgers.write";
    pub const VOUCHERS_WRITE: &'static str = "vouchers.write";
    pub const VOUCHERS_POST: &'static str = "vouchers.post";
    pub const TRANSACTIONS_WRITE: &'static str = "transactions.write";
    pub const TALLY_IMPORT: &'static str = "tally.import";
    pub const TALLY_EXPORT: &'static str = "tally.export";

    /// Every write permission a route can require.
    pub const WRITES: [&'static str; 6] = [
        Self::LEDGERS_WRITE,
        Self::VOUCHERS_WRITE,
        Self::VOUCHERS_POST,
        Self::TRANSACTIONS_WRITE,
        Self::TALLY_IMPORT,
        Self::TALLY_EXPORT,
    ];

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == Self::WILDCARD
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
