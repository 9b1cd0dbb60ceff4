//! Filters and pagination for list queries.
//!
//! All list queries are tenant-scoped and paginated by default.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ledgerdesk_accounting::{Voucher, VoucherCategory, VoucherStatus};
use ledgerdesk_core::LedgerId;

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }

    /// Slice an already-filtered, already-ordered result set.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items: Vec<T> = items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect();
        Page::new(items, total, *self)
    }
}

/// One page of a list query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Size of the whole filtered set, across all pages.
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: Pagination) -> Self {
        let has_more = u64::from(pagination.offset) + (items.len() as u64) < total;
        Self {
            items,
            total,
            limit: pagination.limit,
            offset: pagination.offset,
            has_more,
        }
    }
}

/// Voucher list predicates; `from` and `to` are inclusive voucher dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoucherFilter {
    pub status: Option<VoucherStatus>,
    pub voucher_type: Option<VoucherCategory>,
    pub ledger_id: Option<LedgerId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl VoucherFilter {
    pub fn matches(&self, v: &Voucher) -> bool {
        self.status.is_none_or(|s| v.status == s)
            && self.voucher_type.is_none_or(|t| v.voucher_type == t)
            && self.ledger_id.is_none_or(|l| v.references_ledger(l))
            && self.from.is_none_or(|d| v.date >= d)
            && self.to.is_none_or(|d| v.date <= d)
    }
}
