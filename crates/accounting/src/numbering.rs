//! Voucher numbering series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledgerdesk_core::entity::TenantOwned;
use ledgerdesk_core::{DomainError, DomainResult, Entity, NumberingSeriesId, TenantId};

use crate::voucher_type::VoucherCategory;

const MAX_WIDTH: u8 = 12;
/// Counters are stored as BIGINT.
const MAX_NUMBER: u64 = i64::MAX as u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNumberingSeries {
    pub name: String,
    pub voucher_type: VoucherCategory,
    pub prefix: String,
    pub suffix: String,
    /// Zero-pad width of the numeric part (0 = no padding).
    pub width: u8,
    pub start_at: u64,
}

/// A per-tenant monotonic counter that renders voucher numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingSeries {
    pub id: NumberingSeriesId,
    pub tenant_id: TenantId,
    pub name: String,
    pub voucher_type: VoucherCategory,
    pub prefix: String,
    pub suffix: String,
    pub width: u8,
    pub next_number: u64,
    pub created_at: DateTime<Utc>,
}

impl NumberingSeries {
    pub fn create(
        tenant_id: TenantId,
        new: NewNumberingSeries,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("series name must not be empty"));
        }
        if new.width > MAX_WIDTH {
            return Err(DomainError::validation(format!(
                "series width must be at most {MAX_WIDTH}"
            )));
        }
        if new.start_at == 0 {
            return Err(DomainError::validation("series must start at 1 or later"));
        }
        if new.start_at >= MAX_NUMBER {
            return Err(DomainError::validation(format!(
                "series must start below {MAX_NUMBER}"
            )));
        }

        Ok(Self {
            id: NumberingSeriesId::new(),
            tenant_id,
            name,
            voucher_type: new.voucher_type,
            prefix: new.prefix,
            suffix: new.suffix,
            width: new.width,
            next_number: new.start_at,
            created_at: now,
        })
    }

    pub fn render(&self, n: u64) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            n,
            self.suffix,
            width = self.width as usize
        )
    }

    /// The number `allocate` would hand out, without advancing.
    pub fn peek(&self) -> DomainResult<String> {
        if self.next_number >= MAX_NUMBER {
            return Err(DomainError::validation(format!(
                "numbering series '{}' is exhausted",
                self.name
            )));
        }
        Ok(self.render(self.next_number))
    }

    /// Take the next number and advance the counter.
    pub fn allocate(&mut self) -> DomainResult<String> {
        let number = self.peek()?;
        self.next_number = self
            .next_number
            .checked_add(1)
            .ok_or_else(|| DomainError::validation("series counter overflow"))?;
        Ok(number)
    }
}

impl Entity for NumberingSeries {
    type Id = NumberingSeriesId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for NumberingSeries {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Number for a voucher created without a series or explicit number.
pub fn auto_number(category: VoucherCategory, n: u64) -> String {
    format!("{}-{}", category.abbreviation(), n)
}

/// Uniqueness scope of a voucher number within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberScope {
    Series(NumberingSeriesId),
    VoucherType(VoucherCategory),
}

impl NumberScope {
    /// Stable string form, stored alongside the number.
    pub fn key(&self) -> String {
        match self {
            NumberScope::Series(id) => format!("series:{id}"),
            NumberScope::VoucherType(c) => format!("type:{}", c.as_str()),
        }
    }
}
