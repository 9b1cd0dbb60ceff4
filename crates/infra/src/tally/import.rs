use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use ledgerdesk_accounting::{
    EntryType, LedgerSubtype, NewLedger, ProposedEntry, VoucherCategory, VoucherStatus, name_key,
};
use ledgerdesk_core::TenantId;

use super::columns::{self, parse_amount, parse_date, subtype_for_group};
use super::workbook::{Sheet, Workbook};
use crate::service::{Books, BooksResult, PostVoucher};

/// A row or voucher that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportIssue {
    pub sheet: String,
    /// Spreadsheet row number (the header is row 1).
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub ledgers_created: usize,
    pub parties_created: usize,
    /// Ledger or party rows whose name already exists.
    pub skipped: usize,
    pub vouchers_posted: usize,
    /// Vouchers whose Status column says DRAFT.
    pub drafts_created: usize,
    pub errors: Vec<ImportIssue>,
}

impl ImportReport {
    fn issue(&mut self, sheet: &Sheet, row: usize, message: impl Into<String>) {
        self.errors.push(ImportIssue {
            sheet: sheet.name.clone(),
            row,
            message: message.into(),
        });
    }
}

fn row_number(idx: usize) -> usize {
    idx + 2
}

impl Books {
    /// Create ledgers and parties, then post grouped transaction rows.
    ///
    /// Failures are collected per row or voucher; the rest of the workbook
    /// still imports.
    #[instrument(skip(self, book), fields(tenant_id = %tenant_id, sheets = book.sheets.len()))]
    pub async fn import_tally(&self, tenant_id: TenantId, book: &Workbook) -> BooksResult<ImportReport> {
        let mut report = ImportReport::default();
        let mut known: HashSet<String> = self
            .list_ledgers(tenant_id)
            .await?
            .iter()
            .map(|l| l.name_key())
            .collect();

        if let Some(sheet) = book.sheet(columns::LEDGER_SHEET) {
            let created = self.import_ledgers(tenant_id, sheet, None, &mut known, &mut report).await;
            report.ledgers_created += created;
        }
        if let Some(sheet) = book.sheet(columns::PARTY_SHEET) {
            let created = self
                .import_ledgers(tenant_id, sheet, Some(LedgerSubtype::Customer), &mut known, &mut report)
                .await;
            report.parties_created += created;
        }
        if let Some(sheet) = book.sheet(columns::TRANSACTION_SHEET) {
            self.import_transactions(tenant_id, sheet, &mut report).await;
        }

        if !report.errors.is_empty() {
            warn!(errors = report.errors.len(), "tally import finished with errors");
        }
        info!(
            ledgers_created = report.ledgers_created,
            parties_created = report.parties_created,
            skipped = report.skipped,
            vouchers_posted = report.vouchers_posted,
            drafts_created = report.drafts_created,
            "tally import finished"
        );
        Ok(report)
    }

    async fn import_ledgers(
        &self,
        tenant_id: TenantId,
        sheet: &Sheet,
        default_subtype: Option<LedgerSubtype>,
        known: &mut HashSet<String>,
        report: &mut ImportReport,
    ) -> usize {
        let mut created = 0;
        for (idx, row) in sheet.rows.iter().enumerate() {
            let new = match ledger_from_row(sheet, row, default_subtype) {
                Ok(new) => new,
                Err(message) => {
                    report.issue(sheet, row_number(idx), message);
                    continue;
                }
            };

            let key = name_key(&new.name);
            if known.contains(&key) {
                report.skipped += 1;
                continue;
            }
            match self.create_ledger(tenant_id, new).await {
                Ok(_) => {
                    known.insert(key);
                    created += 1;
                }
                Err(e) if e.is_conflict() => report.skipped += 1,
                Err(e) => report.issue(sheet, row_number(idx), e.to_string()),
            }
        }
        created
    }

    async fn import_transactions(&self, tenant_id: TenantId, sheet: &Sheet, report: &mut ImportReport) {
        let (order, groups) = group_voucher_rows(sheet, report);

        for key in order {
            let Some(rows) = groups.get(&key) else {
                continue;
            };
            let number = &key.number;
            let first = rows.first().copied().map(row_number).unwrap_or(0);
            let cmd = match voucher_from_rows(sheet, number, rows) {
                Ok(cmd) => cmd,
                Err((row, message)) => {
                    report.issue(sheet, row, format!("voucher {number}: {message}"));
                    continue;
                }
            };
            let draft = !cmd.auto_post;
            match self.post_voucher(tenant_id, cmd).await {
                Ok(_) if draft => report.drafts_created += 1,
                Ok(_) => report.vouchers_posted += 1,
                Err(e) => report.issue(sheet, first, format!("voucher {number}: {e}")),
            }
        }
    }
}

/// Rows of one voucher share type, number and (when the sheet has one) date.
/// Numbers restart per voucher type in Tally, so the number alone is not a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct VoucherKey {
    voucher_type: String,
    number: String,
    date: String,
}

/// Group transaction rows by voucher, keeping first-seen order.
///
/// Continuation rows often leave type and date blank; they inherit both
/// from the row above when it carries the same voucher number.
fn group_voucher_rows(sheet: &Sheet, report: &mut ImportReport) -> (Vec<VoucherKey>, HashMap<VoucherKey, Vec<usize>>) {
    let number_col = sheet.column(columns::VOUCHER_NO);
    let type_col = sheet.column(columns::VOUCHER_TYPE);
    let date_col = sheet.column(columns::DATE);

    let mut order: Vec<VoucherKey> = Vec::new();
    let mut groups: HashMap<VoucherKey, Vec<usize>> = HashMap::new();
    let mut previous: Option<VoucherKey> = None;
    for (idx, row) in sheet.rows.iter().enumerate() {
        let Some(number) = sheet.cell(row, number_col) else {
            report.issue(sheet, row_number(idx), "missing voucher number");
            continue;
        };
        let above = previous.as_ref().filter(|p| p.number == number);
        let voucher_type = match sheet.cell(row, type_col) {
            Some(raw) => raw.to_ascii_lowercase(),
            None => above.map(|p| p.voucher_type.clone()).unwrap_or_default(),
        };
        let date = match sheet.cell(row, date_col) {
            Some(raw) => raw.to_string(),
            None => above.map(|p| p.date.clone()).unwrap_or_default(),
        };
        let key = VoucherKey { voucher_type, number: number.to_string(), date };

        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key.clone());
                Vec::new()
            })
            .push(idx);
        previous = Some(key);
    }
    (order, groups)
}

fn ledger_from_row(sheet: &Sheet, row: &[String], default_subtype: Option<LedgerSubtype>) -> Result<NewLedger, String> {
    let name = sheet
        .cell(row, sheet.column(columns::NAME))
        .ok_or("missing ledger name")?;

    let subtype = match sheet.cell(row, sheet.column(columns::GROUP)) {
        Some(group) => subtype_for_group(group).ok_or_else(|| format!("unknown group '{group}'"))?,
        None => default_subtype.ok_or("missing group")?,
    };

    let mut opening = match sheet.cell(row, sheet.column(columns::OPENING)) {
        Some(raw) => parse_amount(raw).ok_or_else(|| format!("invalid opening balance '{raw}'"))?,
        None => Decimal::ZERO,
    };
    if let Some(raw) = sheet.cell(row, sheet.column(columns::OPENING_SIDE)) {
        let side: EntryType = raw.parse().map_err(|_| format!("invalid Dr/Cr '{raw}'"))?;
        if side != subtype.natural_side() {
            opening = -opening;
        }
    }

    let mut new = NewLedger::new(name, subtype, opening);
    new.code = sheet.cell(row, sheet.column(columns::CODE)).map(str::to_string);
    new.gstin = sheet.cell(row, sheet.column(columns::GSTIN)).map(str::to_string);
    Ok(new)
}

/// Build one voucher from its rows; errors carry the offending row number.
fn voucher_from_rows(sheet: &Sheet, number: &str, rows: &[usize]) -> Result<PostVoucher, (usize, String)> {
    let date_col = sheet.column(columns::DATE);
    let type_col = sheet.column(columns::VOUCHER_TYPE);
    let ledger_col = sheet.column(columns::NAME);
    let debit_col = sheet.column(columns::DEBIT);
    let credit_col = sheet.column(columns::CREDIT);
    let narration_col = sheet.column(columns::NARRATION);
    let reference_col = sheet.column(columns::REFERENCE);
    let status_col = sheet.column(columns::STATUS);

    let first_with = |col: Option<usize>| {
        rows.iter()
            .find_map(|&idx| sheet.cell(&sheet.rows[idx], col).map(|v| (idx, v)))
    };
    let head = rows.first().copied().map(row_number).unwrap_or(0);

    let (date_idx, raw_date) = first_with(date_col).ok_or((head, "missing date".to_string()))?;
    let date = parse_date(raw_date).ok_or((row_number(date_idx), format!("invalid date '{raw_date}'")))?;

    let (type_idx, raw_type) = first_with(type_col).ok_or((head, "missing voucher type".to_string()))?;
    let voucher_type: VoucherCategory = raw_type
        .parse()
        .map_err(|_| (row_number(type_idx), format!("unknown voucher type '{raw_type}'")))?;

    let status = match first_with(status_col) {
        Some((idx, raw)) => raw
            .parse::<VoucherStatus>()
            .map_err(|_| (row_number(idx), format!("unknown status '{raw}'")))?,
        None => VoucherStatus::Posted,
    };
    if status == VoucherStatus::Reversed {
        return Err((head, "reversed vouchers are not imported".to_string()));
    }

    let mut entries = Vec::with_capacity(rows.len());
    for &idx in rows {
        let row = &sheet.rows[idx];
        let line = row_number(idx);
        let ledger = sheet.cell(row, ledger_col).ok_or((line, "missing ledger".to_string()))?;

        let debit = sheet.cell(row, debit_col).and_then(parse_amount).unwrap_or(Decimal::ZERO);
        let credit = sheet.cell(row, credit_col).and_then(parse_amount).unwrap_or(Decimal::ZERO);
        let (entry_type, amount) = match (debit > Decimal::ZERO, credit > Decimal::ZERO) {
            (true, false) => (EntryType::Debit, debit),
            (false, true) => (EntryType::Credit, credit),
            _ => return Err((line, "each row needs exactly one positive debit or credit".to_string())),
        };
        entries.push(ProposedEntry::new(ledger, entry_type, amount));
    }

    Ok(PostVoucher {
        voucher_type,
        date,
        narration: first_with(narration_col).map(|(_, v)| v.to_string()),
        reference: first_with(reference_col).map(|(_, v)| v.to_string()),
        voucher_number: Some(number.to_string()),
        numbering_series_id: None,
        entries,
        party_ledger_id: None,
        auto_post: status == VoucherStatus::Posted,
    })
}
