//! Postgres-backed book store.
//!
//! ## Error mapping
//!
//! | SQLx error | Postgres code | StoreError |
//! |------------|---------------|------------|
//! | unique violation | `23505` | `Conflict` |
//! | check violation | `23514` | `Invalid` |
//! | foreign key violation | `23503` | `NotFound` |
//! | anything else | | `Backend` |
//!
//! ## Concurrency
//!
//! Multi-step mutations run in one transaction. Rows whose state is checked
//! (vouchers, series, ledgers touched by a posting) are locked `FOR UPDATE`
//! in id order before the check, and balances move by relative increments
//! (`current_balance = current_balance + $delta`).

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use ledgerdesk_accounting::{
    BalanceDelta, BalanceSide, DraftRevision, Ledger, NewVoucher, NumberingSeries, PostingDirection,
    Voucher, VoucherDeletion, VoucherEntry, VoucherNumbering, VoucherStatus, auto_number,
    balance_deltas,
};
use ledgerdesk_banking::{MockBankAccount, Transaction, TransactionFilter};
use ledgerdesk_core::{
    AccountId, Amount, CostCategoryId, CostCenterId, DomainError, LedgerId, NumberingSeriesId,
    TenantId, TransactionId, VoucherId,
};

use super::schema;
use super::{BookStore, Page, Pagination, RemovedVoucher, StoreError, StoreResult, VoucherFilter};

const LEDGER_COLUMNS: &str = "id, tenant_id, name, code, subtype, balance_type, opening_balance, \
     current_balance, gstin, created_at";

const SERIES_COLUMNS: &str =
    "id, tenant_id, name, voucher_type, prefix, suffix, width, next_number, created_at";

const VOUCHER_COLUMNS: &str = "v.id, v.tenant_id, v.voucher_number, v.voucher_type, \
     v.numbering_series_id, v.voucher_date, v.reference, v.narration, v.total_amount, \
     v.party_ledger_id, v.status, v.created_at, v.updated_at";

const VOUCHER_FILTER: &str = r#"
    WHERE v.tenant_id = $1
        AND ($2::text IS NULL OR v.status = $2)
        AND ($3::text IS NULL OR v.voucher_type = $3)
        AND ($4::uuid IS NULL OR v.party_ledger_id = $4 OR EXISTS (
            SELECT 1 FROM voucher_entries e WHERE e.voucher_id = v.id AND e.ledger_id = $4))
        AND ($5::date IS NULL OR v.voucher_date >= $5)
        AND ($6::date IS NULL OR v.voucher_date <= $6)
"#;

const TRANSACTION_COLUMNS: &str = "id, tenant_id, account_id, amount, kind, description, occurred_at";

const TRANSACTION_FILTER: &str = r#"
    WHERE tenant_id = $1
        AND ($2::uuid IS NULL OR account_id = $2)
        AND ($3::text IS NULL OR kind = $3)
        AND ($4::timestamptz IS NULL OR occurred_at >= $4)
        AND ($5::timestamptz IS NULL OR occurred_at <= $5)
"#;

#[derive(Debug, Clone)]
pub struct PostgresBookStore {
    pool: Arc<PgPool>,
}

impl PostgresBookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes that do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    async fn begin(&self, operation: &str) -> StoreResult<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error(operation, e))
    }

    async fn acquire(&self, operation: &str) -> StoreResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool.acquire().await.map_err(|e| map_sqlx_error(operation, e))
    }
}

#[async_trait]
impl BookStore for PostgresBookStore {
    #[instrument(skip(self, ledger), fields(tenant_id = %ledger.tenant_id, name = %ledger.name), err)]
    async fn insert_ledger(&self, ledger: Ledger) -> StoreResult<Ledger> {
        sqlx::query(
            r#"
            INSERT INTO ledgers (id, tenant_id, name, name_key, code, subtype, balance_type,
                                 opening_balance, current_balance, gstin, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(ledger.id.as_uuid())
        .bind(ledger.tenant_id.as_uuid())
        .bind(&ledger.name)
        .bind(ledger.name_key())
        .bind(ledger.code.as_deref())
        .bind(ledger.subtype.as_str())
        .bind(ledger.balance_type.as_str())
        .bind(ledger.opening_balance)
        .bind(ledger.current_balance)
        .bind(ledger.gstin.as_deref())
        .bind(ledger.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("ledger '{}' already exists", ledger.name))
            } else {
                map_sqlx_error("insert_ledger", e)
            }
        })?;
        Ok(ledger)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, ledger_id = %id), err)]
    async fn get_ledger(&self, tenant_id: TenantId, id: LedgerId) -> StoreResult<Ledger> {
        let sql = format!("SELECT {LEDGER_COLUMNS} FROM ledgers WHERE tenant_id = $1 AND id = $2");
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_ledger", e))?
            .ok_or_else(|| StoreError::NotFound(format!("ledger {id}")))?;
        ledger_from_row(&row)
    }

    #[instrument(skip(self, keys), fields(tenant_id = %tenant_id, count = keys.len()), err)]
    async fn find_ledgers_by_names(&self, tenant_id: TenantId, keys: &[String]) -> StoreResult<Vec<Ledger>> {
        let sql = format!(
            "SELECT {LEDGER_COLUMNS} FROM ledgers WHERE tenant_id = $1 AND name_key = ANY($2)"
        );
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(keys)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_ledgers_by_names", e))?;
        rows.iter().map(ledger_from_row).collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn list_ledgers(&self, tenant_id: TenantId) -> StoreResult<Vec<Ledger>> {
        let sql = format!("SELECT {LEDGER_COLUMNS} FROM ledgers WHERE tenant_id = $1 ORDER BY name_key");
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_ledgers", e))?;
        rows.iter().map(ledger_from_row).collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, ledger_id = %id), err)]
    async fn delete_ledger(&self, tenant_id: TenantId, id: LedgerId) -> StoreResult<()> {
        let mut tx = self.begin("delete_ledger").await?;

        let exists = sqlx::query("SELECT id FROM ledgers WHERE tenant_id = $1 AND id = $2 FOR UPDATE")
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_ledger", e))?;
        if exists.is_none() {
            return Err(StoreError::NotFound(format!("ledger {id}")));
        }

        let referenced: bool = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM vouchers v
                WHERE v.tenant_id = $1
                    AND v.status <> 'REVERSED'
                    AND (v.party_ledger_id = $2 OR EXISTS (
                        SELECT 1 FROM voucher_entries e WHERE e.voucher_id = v.id AND e.ledger_id = $2))
            ) AS referenced
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_ledger", e))?
        .try_get("referenced")
        .map_err(row_error)?;
        if referenced {
            return Err(StoreError::Conflict(format!(
                "ledger {id} is referenced by draft or posted vouchers"
            )));
        }

        sqlx::query("DELETE FROM ledgers WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_ledger", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("delete_ledger", e))
    }

    #[instrument(skip(self, series), fields(tenant_id = %series.tenant_id, name = %series.name), err)]
    async fn insert_series(&self, series: NumberingSeries) -> StoreResult<NumberingSeries> {
        sqlx::query(
            r#"
            INSERT INTO numbering_series (id, tenant_id, name, voucher_type, prefix, suffix, width,
                                          next_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(series.id.as_uuid())
        .bind(series.tenant_id.as_uuid())
        .bind(&series.name)
        .bind(series.voucher_type.as_str())
        .bind(&series.prefix)
        .bind(&series.suffix)
        .bind(i16::from(series.width))
        .bind(to_i64(series.next_number)?)
        .bind(series.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_series", e))?;
        Ok(series)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, series_id = %id), err)]
    async fn get_series(&self, tenant_id: TenantId, id: NumberingSeriesId) -> StoreResult<NumberingSeries> {
        let sql = format!("SELECT {SERIES_COLUMNS} FROM numbering_series WHERE tenant_id = $1 AND id = $2");
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_series", e))?
            .ok_or_else(|| StoreError::NotFound(format!("numbering series {id}")))?;
        series_from_row(&row)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn list_series(&self, tenant_id: TenantId) -> StoreResult<Vec<NumberingSeries>> {
        let sql = format!("SELECT {SERIES_COLUMNS} FROM numbering_series WHERE tenant_id = $1 ORDER BY name");
        let rows = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_series", e))?;
        rows.iter().map(series_from_row).collect()
    }

    #[instrument(
        skip(self, new),
        fields(tenant_id = %new.tenant_id, voucher_id = %new.id, voucher_type = %new.voucher_type),
        err
    )]
    async fn create_voucher(&self, new: NewVoucher) -> StoreResult<Voucher> {
        if new.status == VoucherStatus::Reversed {
            return Err(StoreError::Invalid("a voucher cannot be created REVERSED".to_string()));
        }
        let tenant_id = new.tenant_id;
        let mut tx = self.begin("create_voucher").await?;

        let series = match new.numbering.series() {
            Some(id) => Some(lock_series(&mut tx, tenant_id, id).await?),
            None => None,
        };
        if let Some(series) = &series {
            if series.voucher_type != new.voucher_type {
                return Err(StoreError::Invalid(format!(
                    "numbering series '{}' is for {} vouchers",
                    series.name, series.voucher_type
                )));
            }
        }

        let sides = lock_ledgers(&mut tx, tenant_id, &new.entries, new.party_ledger_id).await?;
        let deltas = balance_deltas(&new.entries, PostingDirection::Apply, |id| sides.get(&id).copied())?;

        let number = match (&new.numbering, &series) {
            (VoucherNumbering::Manual { number, .. }, _) => number.clone(),
            (VoucherNumbering::Series(id), Some(series)) => {
                let number = series.peek()?;
                sqlx::query(
                    "UPDATE numbering_series SET next_number = next_number + 1 WHERE tenant_id = $1 AND id = $2",
                )
                .bind(tenant_id.as_uuid())
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("create_voucher", e))?;
                number
            }
            (VoucherNumbering::Series(id), None) => {
                return Err(StoreError::NotFound(format!("numbering series {id}")));
            }
            (VoucherNumbering::Auto, _) => {
                let n: i64 = sqlx::query(
                    r#"
                    INSERT INTO voucher_counters (tenant_id, voucher_type, last_number)
                    VALUES ($1, $2, 1)
                    ON CONFLICT (tenant_id, voucher_type)
                    DO UPDATE SET last_number = voucher_counters.last_number + 1
                    RETURNING last_number
                    "#,
                )
                .bind(tenant_id.as_uuid())
                .bind(new.voucher_type.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("create_voucher", e))?
                .try_get("last_number")
                .map_err(row_error)?;
                auto_number(new.voucher_type, n.max(1) as u64)
            }
        };

        let voucher = new.into_voucher(number, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO vouchers (id, tenant_id, voucher_number, voucher_type, numbering_series_id,
                                  number_scope, voucher_date, reference, narration, total_amount,
                                  party_ledger_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(voucher.id.as_uuid())
        .bind(tenant_id.as_uuid())
        .bind(&voucher.voucher_number)
        .bind(voucher.voucher_type.as_str())
        .bind(voucher.numbering_series_id.map(Uuid::from))
        .bind(voucher.number_scope().key())
        .bind(voucher.date)
        .bind(voucher.reference.as_deref())
        .bind(voucher.narration.as_deref())
        .bind(voucher.total_amount)
        .bind(voucher.party_ledger_id.map(Uuid::from))
        .bind(voucher.status.as_str())
        .bind(voucher.created_at)
        .bind(voucher.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("voucher number '{}' is already in use", voucher.voucher_number))
            } else {
                map_sqlx_error("create_voucher", e)
            }
        })?;

        insert_entries(&mut tx, tenant_id, voucher.id, &voucher.entries).await?;
        if voucher.affects_balances() {
            apply_deltas(&mut tx, tenant_id, &deltas).await?;
        }

        tx.commit().await.map_err(|e| map_sqlx_error("create_voucher", e))?;
        Ok(voucher)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, voucher_id = %id), err)]
    async fn post_draft(&self, tenant_id: TenantId, id: VoucherId) -> StoreResult<Voucher> {
        let mut tx = self.begin("post_draft").await?;

        let mut voucher = voucher_by_id(&mut tx, tenant_id, id, true).await?;
        voucher.mark_posted(Utc::now())?;

        let sides = lock_ledgers(&mut tx, tenant_id, &voucher.entries, None).await?;
        let deltas = balance_deltas(&voucher.entries, PostingDirection::Apply, |l| sides.get(&l).copied())?;
        apply_deltas(&mut tx, tenant_id, &deltas).await?;
        update_status(&mut tx, &voucher).await?;

        tx.commit().await.map_err(|e| map_sqlx_error("post_draft", e))?;
        Ok(voucher)
    }

    #[instrument(skip(self, revision), fields(tenant_id = %tenant_id, voucher_id = %id), err)]
    async fn replace_draft(
        &self,
        tenant_id: TenantId,
        id: VoucherId,
        revision: DraftRevision,
    ) -> StoreResult<Voucher> {
        let mut tx = self.begin("replace_draft").await?;

        let mut voucher = voucher_by_id(&mut tx, tenant_id, id, true).await?;
        voucher.ensure_can_edit()?;
        let sides = lock_ledgers(&mut tx, tenant_id, &revision.entries, revision.party_ledger_id).await?;
        balance_deltas(&revision.entries, PostingDirection::Apply, |l| sides.get(&l).copied())?;
        voucher.revise_draft(revision, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE vouchers
            SET voucher_date = $3, reference = $4, narration = $5, party_ledger_id = $6,
                total_amount = $7, updated_at = $8
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(id.as_uuid())
        .bind(voucher.date)
        .bind(voucher.reference.as_deref())
        .bind(voucher.narration.as_deref())
        .bind(voucher.party_ledger_id.map(Uuid::from))
        .bind(voucher.total_amount)
        .bind(voucher.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("replace_draft", e))?;

        sqlx::query("DELETE FROM voucher_entries WHERE tenant_id = $1 AND voucher_id = $2")
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("replace_draft", e))?;
        insert_entries(&mut tx, tenant_id, id, &voucher.entries).await?;

        tx.commit().await.map_err(|e| map_sqlx_error("replace_draft", e))?;
        Ok(voucher)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, voucher_id = %id), err)]
    async fn delete_voucher(&self, tenant_id: TenantId, id: VoucherId) -> StoreResult<RemovedVoucher> {
        let mut tx = self.begin("delete_voucher").await?;

        let mut voucher = voucher_by_id(&mut tx, tenant_id, id, true).await?;
        let deletion = voucher.deletion()?;
        match deletion {
            VoucherDeletion::DiscardDraft => {
                sqlx::query("DELETE FROM vouchers WHERE tenant_id = $1 AND id = $2")
                    .bind(tenant_id.as_uuid())
                    .bind(id.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("delete_voucher", e))?;
            }
            VoucherDeletion::ReversePosted => {
                let sides = lock_ledgers(&mut tx, tenant_id, &voucher.entries, None).await?;
                let deltas =
                    balance_deltas(&voucher.entries, PostingDirection::Revert, |l| sides.get(&l).copied())?;
                voucher.mark_reversed(Utc::now())?;
                apply_deltas(&mut tx, tenant_id, &deltas).await?;
                update_status(&mut tx, &voucher).await?;
            }
        }

        tx.commit().await.map_err(|e| map_sqlx_error("delete_voucher", e))?;
        Ok(RemovedVoucher { deletion, voucher })
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, voucher_id = %id), err)]
    async fn get_voucher(&self, tenant_id: TenantId, id: VoucherId) -> StoreResult<Voucher> {
        let mut conn = self.acquire("get_voucher").await?;
        voucher_by_id(&mut conn, tenant_id, id, false).await
    }

    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id, limit = pagination.limit, offset = pagination.offset), err)]
    async fn list_vouchers(
        &self,
        tenant_id: TenantId,
        filter: &VoucherFilter,
        pagination: Pagination,
    ) -> StoreResult<Page<Voucher>> {
        let mut conn = self.acquire("list_vouchers").await?;

        let count_sql = format!("SELECT COUNT(*) AS total FROM vouchers v {VOUCHER_FILTER}");
        let total: i64 = sqlx::query(&count_sql)
            .bind(tenant_id.as_uuid())
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.voucher_type.map(|t| t.as_str()))
            .bind(filter.ledger_id.map(Uuid::from))
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("list_vouchers", e))?
            .try_get("total")
            .map_err(row_error)?;

        let page_sql = format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers v {VOUCHER_FILTER} \
             ORDER BY v.voucher_date DESC, v.created_at DESC, v.id DESC LIMIT $7 OFFSET $8"
        );
        let rows = sqlx::query(&page_sql)
            .bind(tenant_id.as_uuid())
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.voucher_type.map(|t| t.as_str()))
            .bind(filter.ledger_id.map(Uuid::from))
            .bind(filter.from)
            .bind(filter.to)
            .bind(i64::from(pagination.limit))
            .bind(i64::from(pagination.offset))
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("list_vouchers", e))?;

        let ids: Vec<Uuid> = rows
            .iter()
            .map(|r| r.try_get::<Uuid, _>("id"))
            .collect::<Result<_, _>>()
            .map_err(row_error)?;
        let mut entries = entries_for(&mut conn, tenant_id, &ids).await?;

        let items = rows
            .iter()
            .zip(ids.iter())
            .map(|(row, id)| voucher_from_row(row, entries.remove(id).unwrap_or_default()))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Page::new(items, total.max(0) as u64, pagination))
    }

    #[instrument(skip(self, account), fields(tenant_id = %account.tenant_id), err)]
    async fn insert_account(&self, account: MockBankAccount) -> StoreResult<MockBankAccount> {
        sqlx::query(
            "INSERT INTO bank_accounts (id, tenant_id, name, balance, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(account.id.as_uuid())
        .bind(account.tenant_id.as_uuid())
        .bind(&account.name)
        .bind(account.balance)
        .bind(account.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_account", e))?;
        Ok(account)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, account_id = %id), err)]
    async fn get_account(&self, tenant_id: TenantId, id: AccountId) -> StoreResult<MockBankAccount> {
        let row = sqlx::query(
            "SELECT id, tenant_id, name, balance, created_at FROM bank_accounts WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_account", e))?
        .ok_or_else(|| StoreError::NotFound(format!("account {id}")))?;
        account_from_row(&row)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn list_accounts(&self, tenant_id: TenantId) -> StoreResult<Vec<MockBankAccount>> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, name, balance, created_at FROM bank_accounts WHERE tenant_id = $1 ORDER BY created_at",
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_accounts", e))?;
        rows.iter().map(account_from_row).collect()
    }

    #[instrument(
        skip(self, transaction),
        fields(tenant_id = %transaction.tenant_id, account_id = %transaction.account_id),
        err
    )]
    async fn create_transaction(&self, transaction: Transaction) -> StoreResult<Transaction> {
        let mut tx = self.begin("create_transaction").await?;

        let updated = sqlx::query(
            "UPDATE bank_accounts SET balance = balance + $3 WHERE tenant_id = $1 AND id = $2",
        )
        .bind(transaction.tenant_id.as_uuid())
        .bind(transaction.account_id.as_uuid())
        .bind(transaction.balance_delta())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_transaction", e))?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("account {}", transaction.account_id)));
        }

        sqlx::query(
            r#"
            INSERT INTO bank_transactions (id, tenant_id, account_id, amount, kind, description, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.tenant_id.as_uuid())
        .bind(transaction.account_id.as_uuid())
        .bind(transaction.amount.value())
        .bind(transaction.kind.as_str())
        .bind(&transaction.description)
        .bind(transaction.date)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_transaction", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("create_transaction", e))?;
        Ok(transaction)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, transaction_id = %id), err)]
    async fn delete_transaction(&self, tenant_id: TenantId, id: TransactionId) -> StoreResult<Transaction> {
        let mut tx = self.begin("delete_transaction").await?;

        let sql = format!(
            "DELETE FROM bank_transactions WHERE tenant_id = $1 AND id = $2 RETURNING {TRANSACTION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_transaction", e))?
            .ok_or_else(|| StoreError::NotFound(format!("transaction {id}")))?;
        let transaction = transaction_from_row(&row)?;

        sqlx::query("UPDATE bank_accounts SET balance = balance + $3 WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(transaction.account_id.as_uuid())
            .bind(transaction.reversal_delta())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_transaction", e))?;

        tx.commit().await.map_err(|e| map_sqlx_error("delete_transaction", e))?;
        Ok(transaction)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, transaction_id = %id), err)]
    async fn get_transaction(&self, tenant_id: TenantId, id: TransactionId) -> StoreResult<Transaction> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM bank_transactions WHERE tenant_id = $1 AND id = $2");
        let row = sqlx::query(&sql)
            .bind(tenant_id.as_uuid())
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_transaction", e))?
            .ok_or_else(|| StoreError::NotFound(format!("transaction {id}")))?;
        transaction_from_row(&row)
    }

    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id, limit = pagination.limit, offset = pagination.offset), err)]
    async fn query_transactions(
        &self,
        tenant_id: TenantId,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> StoreResult<Page<Transaction>> {
        let count_sql = format!("SELECT COUNT(*) AS total FROM bank_transactions {TRANSACTION_FILTER}");
        let total: i64 = sqlx::query(&count_sql)
            .bind(tenant_id.as_uuid())
            .bind(filter.account_id.map(Uuid::from))
            .bind(filter.kind.map(|k| k.as_str()))
            .bind(filter.start_date)
            .bind(filter.end_date)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_transactions", e))?
            .try_get("total")
            .map_err(row_error)?;

        let page_sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM bank_transactions {TRANSACTION_FILTER} \
             ORDER BY occurred_at DESC, id DESC LIMIT $6 OFFSET $7"
        );
        let rows = sqlx::query(&page_sql)
            .bind(tenant_id.as_uuid())
            .bind(filter.account_id.map(Uuid::from))
            .bind(filter.kind.map(|k| k.as_str()))
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(i64::from(pagination.limit))
            .bind(i64::from(pagination.offset))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_transactions", e))?;

        let items = rows.iter().map(transaction_from_row).collect::<StoreResult<Vec<_>>>()?;
        Ok(Page::new(items, total.max(0) as u64, pagination))
    }
}

// ---------------------------------------------------------------------------
// Transaction-scoped helpers
// ---------------------------------------------------------------------------

async fn lock_series(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    id: NumberingSeriesId,
) -> StoreResult<NumberingSeries> {
    let sql = format!(
        "SELECT {SERIES_COLUMNS} FROM numbering_series WHERE tenant_id = $1 AND id = $2 FOR UPDATE"
    );
    let row = sqlx::query(&sql)
        .bind(tenant_id.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("lock_series", e))?
        .ok_or_else(|| StoreError::NotFound(format!("numbering series {id}")))?;
    series_from_row(&row)
}

/// Lock the ledgers an operation touches (in id order) and return their
/// natural sides. A missing party ledger is `NotFound`; missing entry
/// ledgers surface from `balance_deltas`.
async fn lock_ledgers(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    entries: &[VoucherEntry],
    party: Option<LedgerId>,
) -> StoreResult<HashMap<LedgerId, BalanceSide>> {
    let mut ids: Vec<Uuid> = entries.iter().map(|e| Uuid::from(e.ledger_id)).collect();
    ids.extend(party.map(Uuid::from));
    ids.sort();
    ids.dedup();

    let rows = sqlx::query(
        "SELECT id, balance_type FROM ledgers WHERE tenant_id = $1 AND id = ANY($2) ORDER BY id FOR UPDATE",
    )
    .bind(tenant_id.as_uuid())
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("lock_ledgers", e))?;

    let mut sides = HashMap::with_capacity(rows.len());
    for row in &rows {
        let id: Uuid = row.try_get("id").map_err(row_error)?;
        let side: String = row.try_get("balance_type").map_err(row_error)?;
        sides.insert(LedgerId::from_uuid(id), parse_column("balance_type", &side)?);
    }

    if let Some(party) = party {
        if !sides.contains_key(&party) {
            return Err(StoreError::NotFound(format!("party ledger {party}")));
        }
    }
    Ok(sides)
}

async fn apply_deltas(conn: &mut PgConnection, tenant_id: TenantId, deltas: &[BalanceDelta]) -> StoreResult<()> {
    for d in deltas {
        sqlx::query("UPDATE ledgers SET current_balance = current_balance + $3 WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id.as_uuid())
            .bind(d.ledger_id.as_uuid())
            .bind(d.delta)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("apply_deltas", e))?;
    }
    Ok(())
}

async fn update_status(conn: &mut PgConnection, voucher: &Voucher) -> StoreResult<()> {
    sqlx::query("UPDATE vouchers SET status = $3, updated_at = $4 WHERE tenant_id = $1 AND id = $2")
        .bind(voucher.tenant_id.as_uuid())
        .bind(voucher.id.as_uuid())
        .bind(voucher.status.as_str())
        .bind(voucher.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("update_status", e))?;
    Ok(())
}

async fn insert_entries(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    voucher_id: VoucherId,
    entries: &[VoucherEntry],
) -> StoreResult<()> {
    for e in entries {
        sqlx::query(
            r#"
            INSERT INTO voucher_entries (voucher_id, line_no, tenant_id, ledger_id, ledger_name, ledger_code,
                                         entry_type, amount, narration, cost_center_id, cost_category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(voucher_id.as_uuid())
        .bind(i32::try_from(e.line_no).map_err(|_| StoreError::Invalid("line number out of range".into()))?)
        .bind(tenant_id.as_uuid())
        .bind(e.ledger_id.as_uuid())
        .bind(&e.ledger_name)
        .bind(e.ledger_code.as_deref())
        .bind(e.entry_type.as_str())
        .bind(e.amount.value())
        .bind(e.narration.as_deref())
        .bind(e.cost_center_id.map(Uuid::from))
        .bind(e.cost_category_id.map(Uuid::from))
        .execute(&mut *conn)
        .await
        .map_err(|err| map_sqlx_error("insert_entries", err))?;
    }
    Ok(())
}

async fn voucher_by_id(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    id: VoucherId,
    for_update: bool,
) -> StoreResult<Voucher> {
    let lock = if for_update { "FOR UPDATE" } else { "" };
    let sql = format!("SELECT {VOUCHER_COLUMNS} FROM vouchers v WHERE v.tenant_id = $1 AND v.id = $2 {lock}");
    let row = sqlx::query(&sql)
        .bind(tenant_id.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("voucher_by_id", e))?
        .ok_or_else(|| StoreError::NotFound(format!("voucher {id}")))?;

    let mut entries = entries_for(conn, tenant_id, &[Uuid::from(id)]).await?;
    voucher_from_row(&row, entries.remove(id.as_uuid()).unwrap_or_default())
}

async fn entries_for(
    conn: &mut PgConnection,
    tenant_id: TenantId,
    voucher_ids: &[Uuid],
) -> StoreResult<HashMap<Uuid, Vec<VoucherEntry>>> {
    if voucher_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT voucher_id, line_no, ledger_id, ledger_name, ledger_code, entry_type, amount,
               narration, cost_center_id, cost_category_id
        FROM voucher_entries
        WHERE tenant_id = $1 AND voucher_id = ANY($2)
        ORDER BY voucher_id, line_no
        "#,
    )
    .bind(tenant_id.as_uuid())
    .bind(voucher_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("entries_for", e))?;

    let mut out: HashMap<Uuid, Vec<VoucherEntry>> = HashMap::new();
    for row in &rows {
        let voucher_id: Uuid = row.try_get("voucher_id").map_err(row_error)?;
        out.entry(voucher_id).or_default().push(entry_from_row(row)?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn ledger_from_row(row: &PgRow) -> StoreResult<Ledger> {
    let subtype: String = row.try_get("subtype").map_err(row_error)?;
    let balance_type: String = row.try_get("balance_type").map_err(row_error)?;
    Ok(Ledger {
        id: LedgerId::from_uuid(row.try_get("id").map_err(row_error)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(row_error)?),
        name: row.try_get("name").map_err(row_error)?,
        code: row.try_get("code").map_err(row_error)?,
        subtype: parse_column("subtype", &subtype)?,
        balance_type: parse_column("balance_type", &balance_type)?,
        opening_balance: row.try_get("opening_balance").map_err(row_error)?,
        current_balance: row.try_get("current_balance").map_err(row_error)?,
        gstin: row.try_get("gstin").map_err(row_error)?,
        created_at: row.try_get("created_at").map_err(row_error)?,
    })
}

fn series_from_row(row: &PgRow) -> StoreResult<NumberingSeries> {
    let voucher_type: String = row.try_get("voucher_type").map_err(row_error)?;
    let width: i16 = row.try_get("width").map_err(row_error)?;
    let next_number: i64 = row.try_get("next_number").map_err(row_error)?;
    Ok(NumberingSeries {
        id: NumberingSeriesId::from_uuid(row.try_get("id").map_err(row_error)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(row_error)?),
        name: row.try_get("name").map_err(row_error)?,
        voucher_type: parse_column("voucher_type", &voucher_type)?,
        prefix: row.try_get("prefix").map_err(row_error)?,
        suffix: row.try_get("suffix").map_err(row_error)?,
        width: u8::try_from(width).map_err(|_| StoreError::Backend(format!("bad series width {width}")))?,
        next_number: u64::try_from(next_number)
            .map_err(|_| StoreError::Backend(format!("bad series counter {next_number}")))?,
        created_at: row.try_get("created_at").map_err(row_error)?,
    })
}

fn voucher_from_row(row: &PgRow, entries: Vec<VoucherEntry>) -> StoreResult<Voucher> {
    let voucher_type: String = row.try_get("voucher_type").map_err(row_error)?;
    let status: String = row.try_get("status").map_err(row_error)?;
    let series: Option<Uuid> = row.try_get("numbering_series_id").map_err(row_error)?;
    let party: Option<Uuid> = row.try_get("party_ledger_id").map_err(row_error)?;
    Ok(Voucher {
        id: VoucherId::from_uuid(row.try_get("id").map_err(row_error)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(row_error)?),
        voucher_number: row.try_get("voucher_number").map_err(row_error)?,
        voucher_type: parse_column("voucher_type", &voucher_type)?,
        numbering_series_id: series.map(NumberingSeriesId::from_uuid),
        date: row.try_get("voucher_date").map_err(row_error)?,
        reference: row.try_get("reference").map_err(row_error)?,
        narration: row.try_get("narration").map_err(row_error)?,
        total_amount: row.try_get("total_amount").map_err(row_error)?,
        entries,
        party_ledger_id: party.map(LedgerId::from_uuid),
        status: parse_column::<VoucherStatus>("status", &status)?,
        created_at: row.try_get("created_at").map_err(row_error)?,
        updated_at: row.try_get("updated_at").map_err(row_error)?,
    })
}

fn entry_from_row(row: &PgRow) -> StoreResult<VoucherEntry> {
    let line_no: i32 = row.try_get("line_no").map_err(row_error)?;
    let entry_type: String = row.try_get("entry_type").map_err(row_error)?;
    let amount: Decimal = row.try_get("amount").map_err(row_error)?;
    let cost_center: Option<Uuid> = row.try_get("cost_center_id").map_err(row_error)?;
    let cost_category: Option<Uuid> = row.try_get("cost_category_id").map_err(row_error)?;
    Ok(VoucherEntry {
        line_no: u32::try_from(line_no).map_err(|_| StoreError::Backend(format!("bad line number {line_no}")))?,
        ledger_id: LedgerId::from_uuid(row.try_get("ledger_id").map_err(row_error)?),
        ledger_name: row.try_get("ledger_name").map_err(row_error)?,
        ledger_code: row.try_get("ledger_code").map_err(row_error)?,
        entry_type: parse_column("entry_type", &entry_type)?,
        amount: Amount::new(amount).map_err(|e| StoreError::Backend(e.to_string()))?,
        narration: row.try_get("narration").map_err(row_error)?,
        cost_center_id: cost_center.map(CostCenterId::from_uuid),
        cost_category_id: cost_category.map(CostCategoryId::from_uuid),
    })
}

fn account_from_row(row: &PgRow) -> StoreResult<MockBankAccount> {
    Ok(MockBankAccount {
        id: AccountId::from_uuid(row.try_get("id").map_err(row_error)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(row_error)?),
        name: row.try_get("name").map_err(row_error)?,
        balance: row.try_get("balance").map_err(row_error)?,
        created_at: row.try_get("created_at").map_err(row_error)?,
    })
}

fn transaction_from_row(row: &PgRow) -> StoreResult<Transaction> {
    let kind: String = row.try_get("kind").map_err(row_error)?;
    let amount: Decimal = row.try_get("amount").map_err(row_error)?;
    Ok(Transaction {
        id: TransactionId::from_uuid(row.try_get("id").map_err(row_error)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(row_error)?),
        account_id: AccountId::from_uuid(row.try_get("account_id").map_err(row_error)?),
        amount: Amount::new(amount).map_err(|e| StoreError::Backend(e.to_string()))?,
        kind: parse_column("kind", &kind)?,
        description: row.try_get("description").map_err(row_error)?,
        date: row.try_get("occurred_at").map_err(row_error)?,
    })
}

fn parse_column<T>(column: &str, raw: &str) -> StoreResult<T>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|e: DomainError| StoreError::Backend(format!("column {column}: {e}")))
}

fn to_i64(n: u64) -> StoreResult<i64> {
    i64::try_from(n).map_err(|_| StoreError::Invalid(format!("{n} is out of range")))
}

fn row_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23514") => StoreError::Invalid(msg),
                Some("23503") => StoreError::NotFound(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
