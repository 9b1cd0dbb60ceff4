//! Voucher poster, draft editing and reversal.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use ledgerdesk_accounting::{
    DraftRevision, Ledger, NewVoucher, ProposedEntry, Voucher, VoucherCategory, VoucherDeletion,
    VoucherEntry, VoucherNumbering, VoucherStatus, name_key, validate_entries,
};
use ledgerdesk_core::{DomainError, LedgerId, NumberingSeriesId, TenantId, VoucherId};

use super::{Books, BooksResult};
use crate::store::{MAX_LIMIT, Page, Pagination, RemovedVoucher, VoucherFilter};

fn default_auto_post() -> bool {
    true
}

/// Request to record a voucher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostVoucher {
    #[serde(alias = "voucher_type_id")]
    pub voucher_type: VoucherCategory,
    pub date: NaiveDate,
    #[serde(default)]
    pub narration: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    /// Explicit number; otherwise the series or the per-type counter numbers it.
    #[serde(default)]
    pub voucher_number: Option<String>,
    #[serde(default)]
    pub numbering_series_id: Option<NumberingSeriesId>,
    pub entries: Vec<ProposedEntry>,
    #[serde(default)]
    pub party_ledger_id: Option<LedgerId>,
    /// `false` saves a DRAFT with no balance effect.
    #[serde(default = "default_auto_post")]
    pub auto_post: bool,
}

/// Replacement content for a draft.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditDraft {
    pub date: NaiveDate,
    #[serde(default)]
    pub narration: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    pub entries: Vec<ProposedEntry>,
    #[serde(default)]
    pub party_ledger_id: Option<LedgerId>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Books {
    /// Validate, resolve and hand a voucher to the store.
    ///
    /// Nothing is read from the store until the entries balance.
    #[instrument(skip(self, cmd), fields(tenant_id = %tenant_id, voucher_type = %cmd.voucher_type))]
    pub async fn post_voucher(&self, tenant_id: TenantId, cmd: PostVoucher) -> BooksResult<Voucher> {
        let total = validate_entries(&cmd.entries).inspect_err(|e| warn!(error = %e, "voucher rejected"))?;

        let entries = self.resolve_entries(tenant_id, cmd.entries).await?;
        if let Some(party) = cmd.party_ledger_id {
            self.store.get_ledger(tenant_id, party).await?;
        }

        let series = match cmd.numbering_series_id {
            Some(id) => {
                let series = self.store.get_series(tenant_id, id).await?;
                if series.voucher_type != cmd.voucher_type {
                    return Err(DomainError::validation(format!(
                        "numbering series '{}' is for {} vouchers, not {}",
                        series.name, series.voucher_type, cmd.voucher_type
                    ))
                    .into());
                }
                Some(series.id)
            }
            None => None,
        };

        let numbering = match (blank_to_none(cmd.voucher_number), series) {
            (Some(number), series) => VoucherNumbering::manual(number, series)?,
            (None, Some(id)) => VoucherNumbering::Series(id),
            (None, None) => VoucherNumbering::Auto,
        };

        let new = NewVoucher {
            id: VoucherId::new(),
            tenant_id,
            voucher_type: cmd.voucher_type,
            numbering,
            date: cmd.date,
            reference: blank_to_none(cmd.reference),
            narration: blank_to_none(cmd.narration),
            total_amount: total,
            entries,
            party_ledger_id: cmd.party_ledger_id,
            status: if cmd.auto_post {
                VoucherStatus::Posted
            } else {
                VoucherStatus::Draft
            },
        };

        let voucher = self.store.create_voucher(new).await?;
        info!(
            voucher_id = %voucher.id,
            voucher_number = %voucher.voucher_number,
            status = %voucher.status,
            total = %voucher.total_amount,
            "voucher recorded"
        );
        Ok(voucher)
    }

    /// Replace a draft's content; entries are re-validated and re-resolved.
    #[instrument(skip(self, edit), fields(tenant_id = %tenant_id, voucher_id = %id))]
    pub async fn update_draft(&self, tenant_id: TenantId, id: VoucherId, edit: EditDraft) -> BooksResult<Voucher> {
        let total = validate_entries(&edit.entries).inspect_err(|e| warn!(error = %e, "draft edit rejected"))?;
        let entries = self.resolve_entries(tenant_id, edit.entries).await?;

        let revision = DraftRevision {
            date: edit.date,
            reference: blank_to_none(edit.reference),
            narration: blank_to_none(edit.narration),
            party_ledger_id: edit.party_ledger_id,
            entries,
            total_amount: total,
        };
        let voucher = self.store.replace_draft(tenant_id, id, revision).await?;
        info!(voucher_number = %voucher.voucher_number, "draft updated");
        Ok(voucher)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, voucher_id = %id))]
    pub async fn post_draft(&self, tenant_id: TenantId, id: VoucherId) -> BooksResult<Voucher> {
        let voucher = self.store.post_draft(tenant_id, id).await?;
        info!(voucher_number = %voucher.voucher_number, "draft posted");
        Ok(voucher)
    }

    /// Discard a draft or reverse a posted voucher.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, voucher_id = %id))]
    pub async fn delete_voucher(&self, tenant_id: TenantId, id: VoucherId) -> BooksResult<RemovedVoucher> {
        let removed = self.store.delete_voucher(tenant_id, id).await?;
        match removed.deletion {
            VoucherDeletion::DiscardDraft => info!(voucher_number = %removed.voucher.voucher_number, "draft discarded"),
            VoucherDeletion::ReversePosted => info!(voucher_number = %removed.voucher.voucher_number, "voucher reversed"),
        }
        Ok(removed)
    }

    pub async fn get_voucher(&self, tenant_id: TenantId, id: VoucherId) -> BooksResult<Voucher> {
        Ok(self.store.get_voucher(tenant_id, id).await?)
    }

    pub async fn list_vouchers(
        &self,
        tenant_id: TenantId,
        filter: &VoucherFilter,
        pagination: Pagination,
    ) -> BooksResult<Page<Voucher>> {
        Ok(self.store.list_vouchers(tenant_id, filter, pagination).await?)
    }

    /// Every voucher matching `filter`, fetched a page at a time.
    pub(crate) async fn all_vouchers(&self, tenant_id: TenantId, filter: &VoucherFilter) -> BooksResult<Vec<Voucher>> {
        let mut out = Vec::new();
        let mut offset = 0u32;
        loop {
            let page = self
                .store
                .list_vouchers(tenant_id, filter, Pagination::new(Some(MAX_LIMIT), Some(offset)))
                .await?;
            let has_more = page.has_more;
            offset = offset.saturating_add(page.items.len() as u32);
            out.extend(page.items);
            if !has_more {
                return Ok(out);
            }
        }
    }

    /// Bind entries to tenant ledgers by case-insensitive name.
    async fn resolve_entries(&self, tenant_id: TenantId, proposed: Vec<ProposedEntry>) -> BooksResult<Vec<VoucherEntry>> {
        let mut keys: Vec<String> = proposed.iter().map(|e| name_key(&e.ledger_name)).collect();
        keys.sort();
        keys.dedup();

        let by_key: HashMap<String, Ledger> = self
            .store
            .find_ledgers_by_names(tenant_id, &keys)
            .await?
            .into_iter()
            .map(|l| (l.name_key(), l))
            .collect();

        let mut entries = Vec::with_capacity(proposed.len());
        for (idx, entry) in proposed.into_iter().enumerate() {
            let ledger = by_key.get(&name_key(&entry.ledger_name)).ok_or_else(|| {
                warn!(ledger = %entry.ledger_name, "unknown ledger in voucher");
                DomainError::not_found(format!("ledger '{}'", entry.ledger_name.trim()))
            })?;
            entries.push(entry.resolve(idx as u32 + 1, ledger.id, ledger.name.clone())?);
        }
        Ok(entries)
    }
}
