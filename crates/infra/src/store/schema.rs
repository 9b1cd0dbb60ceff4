//! Postgres schema, applied idempotently at startup.
//!
//! Money columns are NUMERIC so decimals round-trip exactly. Balances are
//! bounded by the largest `rust_decimal::Decimal` so a relative update can
//! never store a value the service cannot read back.

pub(super) const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS ledgers (
        id              UUID PRIMARY KEY,
        tenant_id       UUID NOT NULL,
        name            TEXT NOT NULL,
        name_key        TEXT NOT NULL,
        code            TEXT NULL,
        subtype         TEXT NOT NULL,
        balance_type    TEXT NOT NULL CHECK (balance_type IN ('DEBIT', 'CREDIT')),
        opening_balance NUMERIC NOT NULL CHECK (abs(opening_balance) <= 79228162514264337593543950335),
        current_balance NUMERIC NOT NULL CHECK (abs(current_balance) <= 79228162514264337593543950335),
        gstin           TEXT NULL,
        created_at      TIMESTAMPTZ NOT NULL,
        UNIQUE (tenant_id, name_key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS numbering_series (
        id           UUID PRIMARY KEY,
        tenant_id    UUID NOT NULL,
        name         TEXT NOT NULL,
        voucher_type TEXT NOT NULL,
        prefix       TEXT NOT NULL,
        suffix       TEXT NOT NULL,
        width        SMALLINT NOT NULL CHECK (width >= 0),
        next_number  BIGINT NOT NULL CHECK (next_number >= 1),
        created_at   TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS voucher_counters (
        tenant_id    UUID NOT NULL,
        voucher_type TEXT NOT NULL,
        last_number  BIGINT NOT NULL,
        PRIMARY KEY (tenant_id, voucher_type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vouchers (
        id                  UUID PRIMARY KEY,
        tenant_id           UUID NOT NULL,
        voucher_number      TEXT NOT NULL,
        voucher_type        TEXT NOT NULL,
        numbering_series_id UUID NULL,
        number_scope        TEXT NOT NULL,
        voucher_date        DATE NOT NULL,
        reference           TEXT NULL,
        narration           TEXT NULL,
        total_amount        NUMERIC NOT NULL CHECK (total_amount > 0),
        party_ledger_id     UUID NULL,
        status              TEXT NOT NULL CHECK (status IN ('DRAFT', 'POSTED', 'REVERSED')),
        created_at          TIMESTAMPTZ NOT NULL,
        updated_at          TIMESTAMPTZ NOT NULL,
        UNIQUE (tenant_id, number_scope, voucher_number)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS vouchers_tenant_date_idx
        ON vouchers (tenant_id, voucher_date DESC, created_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS voucher_entries (
        voucher_id       UUID NOT NULL REFERENCES vouchers (id) ON DELETE CASCADE,
        line_no          INTEGER NOT NULL,
        tenant_id        UUID NOT NULL,
        ledger_id        UUID NOT NULL,
        ledger_name      TEXT NOT NULL,
        ledger_code      TEXT NULL,
        entry_type       TEXT NOT NULL CHECK (entry_type IN ('DEBIT', 'CREDIT')),
        amount           NUMERIC NOT NULL CHECK (amount > 0),
        narration        TEXT NULL,
        cost_center_id   UUID NULL,
        cost_category_id UUID NULL,
        PRIMARY KEY (voucher_id, line_no)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS voucher_entries_ledger_idx
        ON voucher_entries (tenant_id, ledger_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bank_accounts (
        id         UUID PRIMARY KEY,
        tenant_id  UUID NOT NULL,
        name       TEXT NOT NULL,
        balance    NUMERIC NOT NULL CHECK (abs(balance) <= 79228162514264337593543950335),
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bank_transactions (
        id          UUID PRIMARY KEY,
        tenant_id   UUID NOT NULL,
        account_id  UUID NOT NULL REFERENCES bank_accounts (id),
        amount      NUMERIC NOT NULL CHECK (amount > 0),
        kind        TEXT NOT NULL CHECK (kind IN ('CREDIT', 'DEBIT')),
        description TEXT NOT NULL,
        occurred_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS bank_transactions_tenant_date_idx
        ON bank_transactions (tenant_id, occurred_at DESC)
    "#,
];
