//! In-memory book store for tests and development.
//!
//! All state sits behind one `RwLock`. A mutation takes the write lock,
//! checks every precondition, and only then changes anything, which gives
//! the same all-or-nothing behaviour as a database transaction.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;

use ledgerdesk_accounting::{
    BalanceDelta, BalanceSide, DraftRevision, Ledger, NewVoucher, NumberingSeries, PostingDirection,
    Voucher, VoucherCategory, VoucherDeletion, VoucherEntry, VoucherNumbering, VoucherStatus,
    auto_number, balance_deltas,
};
use ledgerdesk_banking::{MockBankAccount, Transaction, TransactionFilter};
use ledgerdesk_core::{
    AccountId, LedgerId, NumberingSeriesId, TenantId, TransactionId, VoucherId,
};

use super::{BookStore, Page, Pagination, RemovedVoucher, StoreError, StoreResult, VoucherFilter};

#[derive(Debug, Default)]
struct BookState {
    ledgers: HashMap<(TenantId, LedgerId), Ledger>,
    series: HashMap<(TenantId, NumberingSeriesId), NumberingSeries>,
    type_counters: HashMap<(TenantId, VoucherCategory), u64>,
    vouchers: HashMap<(TenantId, VoucherId), Voucher>,
    /// (tenant, number scope key, voucher number)
    numbers: HashSet<(TenantId, String, String)>,
    accounts: HashMap<(TenantId, AccountId), MockBankAccount>,
    transactions: HashMap<(TenantId, TransactionId), Transaction>,
}

impl BookState {
    fn ledger_side(&self, tenant_id: TenantId, id: LedgerId) -> Option<BalanceSide> {
        self.ledgers.get(&(tenant_id, id)).map(|l| l.balance_type)
    }

    /// Also serves as the existence check for every entry ledger.
    fn deltas(
        &self,
        tenant_id: TenantId,
        entries: &[VoucherEntry],
        direction: PostingDirection,
    ) -> StoreResult<Vec<BalanceDelta>> {
        Ok(balance_deltas(entries, direction, |id| self.ledger_side(tenant_id, id))?)
    }

    fn ensure_party(&self, tenant_id: TenantId, party: Option<LedgerId>) -> StoreResult<()> {
        match party {
            Some(id) if !self.ledgers.contains_key(&(tenant_id, id)) => {
                Err(StoreError::NotFound(format!("party ledger {id}")))
            }
            _ => Ok(()),
        }
    }

    /// New balances for every delta, or the first overflow. Deltas arrive
    /// aggregated per ledger, so each ledger appears at most once.
    fn plan_balances(&self, tenant_id: TenantId, deltas: &[BalanceDelta]) -> StoreResult<Vec<(LedgerId, Decimal)>> {
        deltas
            .iter()
            .map(|d| -> StoreResult<(LedgerId, Decimal)> {
                let ledger = self
                    .ledgers
                    .get(&(tenant_id, d.ledger_id))
                    .ok_or_else(|| StoreError::NotFound(format!("ledger {}", d.ledger_id)))?;
                Ok((d.ledger_id, ledger.balance_after(d.delta)?))
            })
            .collect()
    }

    fn commit_balances(&mut self, tenant_id: TenantId, balances: Vec<(LedgerId, Decimal)>) {
        for (id, balance) in balances {
            if let Some(ledger) = self.ledgers.get_mut(&(tenant_id, id)) {
                ledger.current_balance = balance;
            }
        }
    }

    fn voucher(&self, tenant_id: TenantId, id: VoucherId) -> StoreResult<&Voucher> {
        self.vouchers
            .get(&(tenant_id, id))
            .ok_or_else(|| StoreError::NotFound(format!("voucher {id}")))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBookStore {
    state: RwLock<BookState>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BookState>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("book state lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BookState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("book state lock poisoned".to_string()))
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    #[instrument(skip(self, ledger), fields(tenant_id = %ledger.tenant_id, name = %ledger.name), err)]
    async fn insert_ledger(&self, ledger: Ledger) -> StoreResult<Ledger> {
        let mut state = self.write()?;
        let key = ledger.name_key();
        let duplicate = state
            .ledgers
            .values()
            .any(|l| l.tenant_id == ledger.tenant_id && (l.id == ledger.id || l.name_key() == key));
        if duplicate {
            return Err(StoreError::Conflict(format!("ledger '{}' already exists", ledger.name)));
        }
        state.ledgers.insert((ledger.tenant_id, ledger.id), ledger.clone());
        Ok(ledger)
    }

    async fn get_ledger(&self, tenant_id: TenantId, id: LedgerId) -> StoreResult<Ledger> {
        self.read()?
            .ledgers
            .get(&(tenant_id, id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("ledger {id}")))
    }

    async fn find_ledgers_by_names(&self, tenant_id: TenantId, keys: &[String]) -> StoreResult<Vec<Ledger>> {
        let state = self.read()?;
        Ok(state
            .ledgers
            .values()
            .filter(|l| l.tenant_id == tenant_id && keys.contains(&l.name_key()))
            .cloned()
            .collect())
    }

    async fn list_ledgers(&self, tenant_id: TenantId) -> StoreResult<Vec<Ledger>> {
        let state = self.read()?;
        let mut out: Vec<Ledger> = state
            .ledgers
            .values()
            .filter(|l| l.tenant_id == tenant_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name_key().cmp(&b.name_key()));
        Ok(out)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, ledger_id = %id), err)]
    async fn delete_ledger(&self, tenant_id: TenantId, id: LedgerId) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.ledgers.contains_key(&(tenant_id, id)) {
            return Err(StoreError::NotFound(format!("ledger {id}")));
        }
        let referenced = state.vouchers.values().any(|v| {
            v.tenant_id == tenant_id && v.status != VoucherStatus::Reversed && v.references_ledger(id)
        });
        if referenced {
            return Err(StoreError::Conflict(format!(
                "ledger {id} is referenced by draft or posted vouchers"
            )));
        }
        state.ledgers.remove(&(tenant_id, id));
        Ok(())
    }

    async fn insert_series(&self, series: NumberingSeries) -> StoreResult<NumberingSeries> {
        let mut state = self.write()?;
        if state.series.contains_key(&(series.tenant_id, series.id)) {
            return Err(StoreError::Conflict(format!("numbering series {} already exists", series.id)));
        }
        state.series.insert((series.tenant_id, series.id), series.clone());
        Ok(series)
    }

    async fn get_series(&self, tenant_id: TenantId, id: NumberingSeriesId) -> StoreResult<NumberingSeries> {
        self.read()?
            .series
            .get(&(tenant_id, id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("numbering series {id}")))
    }

    async fn list_series(&self, tenant_id: TenantId) -> StoreResult<Vec<NumberingSeries>> {
        let state = self.read()?;
        let mut out: Vec<NumberingSeries> = state
            .series
            .values()
            .filter(|s| s.tenant_id == tenant_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    #[instrument(
        skip(self, new),
        fields(tenant_id = %new.tenant_id, voucher_id = %new.id, voucher_type = %new.voucher_type),
        err
    )]
    async fn create_voucher(&self, new: NewVoucher) -> StoreResult<Voucher> {
        let tenant_id = new.tenant_id;
        let mut guard = self.write()?;
        let state = &mut *guard;

        if new.status == VoucherStatus::Reversed {
            return Err(StoreError::Invalid("a voucher cannot be created REVERSED".to_string()));
        }
        if state.vouchers.contains_key(&(tenant_id, new.id)) {
            return Err(StoreError::Conflict(format!("voucher {} already exists", new.id)));
        }
        if let Some(series_id) = new.numbering.series() {
            let series = state
                .series
                .get(&(tenant_id, series_id))
                .ok_or_else(|| StoreError::NotFound(format!("numbering series {series_id}")))?;
            if series.voucher_type != new.voucher_type {
                return Err(StoreError::Invalid(format!(
                    "numbering series '{}' is for {} vouchers",
                    series.name, series.voucher_type
                )));
            }
        }
        state.ensure_party(tenant_id, new.party_ledger_id)?;
        let deltas = state.deltas(tenant_id, &new.entries, PostingDirection::Apply)?;
        let balances = if new.status == VoucherStatus::Posted {
            state.plan_balances(tenant_id, &deltas)?
        } else {
            Vec::new()
        };

        let next_auto = state
            .type_counters
            .get(&(tenant_id, new.voucher_type))
            .copied()
            .unwrap_or(0)
            .saturating_add(1);
        let number = match &new.numbering {
            VoucherNumbering::Manual { number, .. } => number.clone(),
            VoucherNumbering::Series(id) => state
                .series
                .get(&(tenant_id, *id))
                .ok_or_else(|| StoreError::NotFound(format!("numbering series {id}")))?
                .peek()?,
            VoucherNumbering::Auto => auto_number(new.voucher_type, next_auto),
        };
        let number_key = (tenant_id, new.number_scope().key(), number.clone());
        if state.numbers.contains(&number_key) {
            return Err(StoreError::Conflict(format!("voucher number '{number}' is already in use")));
        }

        // All checks passed; commit.
        match &new.numbering {
            VoucherNumbering::Series(id) => {
                if let Some(series) = state.series.get_mut(&(tenant_id, *id)) {
                    series.allocate()?;
                }
            }
            VoucherNumbering::Auto => {
                state.type_counters.insert((tenant_id, new.voucher_type), next_auto);
            }
            VoucherNumbering::Manual { .. } => {}
        }

        let voucher = new.into_voucher(number, Utc::now());
        state.commit_balances(tenant_id, balances);
        state.numbers.insert(number_key);
        state.vouchers.insert((tenant_id, voucher.id), voucher.clone());
        Ok(voucher)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, voucher_id = %id), err)]
    async fn post_draft(&self, tenant_id: TenantId, id: VoucherId) -> StoreResult<Voucher> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let mut voucher = state.voucher(tenant_id, id)?.clone();
        voucher.mark_posted(Utc::now())?;
        let deltas = state.deltas(tenant_id, &voucher.entries, PostingDirection::Apply)?;
        let balances = state.plan_balances(tenant_id, &deltas)?;

        state.commit_balances(tenant_id, balances);
        state.vouchers.insert((tenant_id, id), voucher.clone());
        Ok(voucher)
    }

    #[instrument(skip(self, revision), fields(tenant_id = %tenant_id, voucher_id = %id), err)]
    async fn replace_draft(
        &self,
        tenant_id: TenantId,
        id: VoucherId,
        revision: DraftRevision,
    ) -> StoreResult<Voucher> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let mut voucher = state.voucher(tenant_id, id)?.clone();
        voucher.ensure_can_edit()?;
        state.ensure_party(tenant_id, revision.party_ledger_id)?;
        state.deltas(tenant_id, &revision.entries, PostingDirection::Apply)?;

        voucher.revise_draft(revision, Utc::now())?;
        state.vouchers.insert((tenant_id, id), voucher.clone());
        Ok(voucher)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, voucher_id = %id), err)]
    async fn delete_voucher(&self, tenant_id: TenantId, id: VoucherId) -> StoreResult<RemovedVoucher> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let mut voucher = state.voucher(tenant_id, id)?.clone();
        let deletion = voucher.deletion()?;
        match deletion {
            VoucherDeletion::DiscardDraft => {
                state.vouchers.remove(&(tenant_id, id));
                state
                    .numbers
                    .remove(&(tenant_id, voucher.number_scope().key(), voucher.voucher_number.clone()));
            }
            VoucherDeletion::ReversePosted => {
                let deltas = state.deltas(tenant_id, &voucher.entries, PostingDirection::Revert)?;
                let balances = state.plan_balances(tenant_id, &deltas)?;
                voucher.mark_reversed(Utc::now())?;
                state.commit_balances(tenant_id, balances);
                state.vouchers.insert((tenant_id, id), voucher.clone());
            }
        }
        Ok(RemovedVoucher { deletion, voucher })
    }

    async fn get_voucher(&self, tenant_id: TenantId, id: VoucherId) -> StoreResult<Voucher> {
        self.read()?.voucher(tenant_id, id).cloned()
    }

    async fn list_vouchers(
        &self,
        tenant_id: TenantId,
        filter: &VoucherFilter,
        pagination: Pagination,
    ) -> StoreResult<Page<Voucher>> {
        let state = self.read()?;
        let mut matching: Vec<Voucher> = state
            .vouchers
            .values()
            .filter(|v| v.tenant_id == tenant_id && filter.matches(v))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.date, b.created_at, b.id.as_uuid()).cmp(&(a.date, a.created_at, a.id.as_uuid())));
        Ok(pagination.apply(matching))
    }

    async fn insert_account(&self, account: MockBankAccount) -> StoreResult<MockBankAccount> {
        let mut state = self.write()?;
        if state.accounts.contains_key(&(account.tenant_id, account.id)) {
            return Err(StoreError::Conflict(format!("account {} already exists", account.id)));
        }
        state.accounts.insert((account.tenant_id, account.id), account.clone());
        Ok(account)
    }

    async fn get_account(&self, tenant_id: TenantId, id: AccountId) -> StoreResult<MockBankAccount> {
        self.read()?
            .accounts
            .get(&(tenant_id, id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("account {id}")))
    }

    async fn list_accounts(&self, tenant_id: TenantId) -> StoreResult<Vec<MockBankAccount>> {
        let state = self.read()?;
        let mut out: Vec<MockBankAccount> = state
            .accounts
            .values()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    #[instrument(
        skip(self, transaction),
        fields(tenant_id = %transaction.tenant_id, account_id = %transaction.account_id),
        err
    )]
    async fn create_transaction(&self, transaction: Transaction) -> StoreResult<Transaction> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let tenant_id = transaction.tenant_id;

        if state.transactions.contains_key(&(tenant_id, transaction.id)) {
            return Err(StoreError::Conflict(format!("transaction {} already exists", transaction.id)));
        }
        let account = state
            .accounts
            .get_mut(&(tenant_id, transaction.account_id))
            .ok_or_else(|| StoreError::NotFound(format!("account {}", transaction.account_id)))?;

        account.apply_delta(transaction.balance_delta())?;
        state.transactions.insert((tenant_id, transaction.id), transaction.clone());
        Ok(transaction)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, transaction_id = %id), err)]
    async fn delete_transaction(&self, tenant_id: TenantId, id: TransactionId) -> StoreResult<Transaction> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let transaction = state
            .transactions
            .get(&(tenant_id, id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("transaction {id}")))?;
        if let Some(account) = state.accounts.get_mut(&(tenant_id, transaction.account_id)) {
            account.apply_delta(transaction.reversal_delta())?;
        }
        state.transactions.remove(&(tenant_id, id));
        Ok(transaction)
    }

    async fn get_transaction(&self, tenant_id: TenantId, id: TransactionId) -> StoreResult<Transaction> {
        self.read()?
            .transactions
            .get(&(tenant_id, id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("transaction {id}")))
    }

    async fn query_transactions(
        &self,
        tenant_id: TenantId,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> StoreResult<Page<Transaction>> {
        let state = self.read()?;
        let mut matching: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| t.tenant_id == tenant_id && filter.matches(t))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.date, b.id.as_uuid()).cmp(&(a.date, a.id.as_uuid())));
        Ok(pagination.apply(matching))
    }
}
