use chrono::Utc;
use tracing::{info, instrument};

use ledgerdesk_accounting::{
    Ledger, NewLedger, NewNumberingSeries, NumberingSeries, Reconciliation, VoucherStatus,
    VoucherType, reconcile,
};
use ledgerdesk_core::{LedgerId, TenantId};

use super::{Books, BooksResult};
use crate::store::VoucherFilter;

impl Books {
    #[instrument(skip(self, new), fields(tenant_id = %tenant_id, name = %new.name))]
    pub async fn create_ledger(&self, tenant_id: TenantId, new: NewLedger) -> BooksResult<Ledger> {
        let ledger = Ledger::open(tenant_id, new, Utc::now())?;
        let ledger = self.store.insert_ledger(ledger).await?;
        info!(ledger_id = %ledger.id, subtype = %ledger.subtype, "ledger created");
        Ok(ledger)
    }

    pub async fn get_ledger(&self, tenant_id: TenantId, id: LedgerId) -> BooksResult<Ledger> {
        Ok(self.store.get_ledger(tenant_id, id).await?)
    }

    pub async fn list_ledgers(&self, tenant_id: TenantId) -> BooksResult<Vec<Ledger>> {
        Ok(self.store.list_ledgers(tenant_id).await?)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, ledger_id = %id))]
    pub async fn delete_ledger(&self, tenant_id: TenantId, id: LedgerId) -> BooksResult<()> {
        self.store.delete_ledger(tenant_id, id).await?;
        info!("ledger deleted");
        Ok(())
    }

    /// Compare the stored balance with the one implied by posted vouchers.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, ledger_id = %id))]
    pub async fn reconcile_ledger(&self, tenant_id: TenantId, id: LedgerId) -> BooksResult<Reconciliation> {
        let ledger = self.store.get_ledger(tenant_id, id).await?;

        let filter = VoucherFilter {
            status: Some(VoucherStatus::Posted),
            ledger_id: Some(id),
            ..Default::default()
        };
        let posted = self.all_vouchers(tenant_id, &filter).await?;

        let result = reconcile(&ledger, &posted)?;
        if !result.balanced {
            tracing::warn!(difference = %result.difference, "ledger balance does not reconcile");
        }
        Ok(result)
    }

    pub fn voucher_types(&self) -> Vec<VoucherType> {
        VoucherType::catalog()
    }

    #[instrument(skip(self, new), fields(tenant_id = %tenant_id, name = %new.name))]
    pub async fn create_series(
        &self,
        tenant_id: TenantId,
        new: NewNumberingSeries,
    ) -> BooksResult<NumberingSeries> {
        let series = NumberingSeries::create(tenant_id, new, Utc::now())?;
        Ok(self.store.insert_series(series).await?)
    }

    pub async fn list_series(&self, tenant_id: TenantId) -> BooksResult<Vec<NumberingSeries>> {
        Ok(self.store.list_series(tenant_id).await?)
    }
}
