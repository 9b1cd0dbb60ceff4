use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use ledgerdesk_accounting::{EntryType, Ledger, LedgerSubtype, Voucher, VoucherStatus};
use ledgerdesk_core::money::{checked_add, checked_sub};
use ledgerdesk_core::{DomainError, DomainResult, LedgerId, TenantId};

use super::columns::group_for_subtype;
use super::workbook::{Sheet, Workbook};
use crate::service::{Books, BooksResult};
use crate::store::VoucherFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Vouchers,
    Ledgers,
    Gst,
}

impl core::str::FromStr for ExportKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vouchers" => Ok(ExportKind::Vouchers),
            "ledgers" => Ok(ExportKind::Ledgers),
            "gst" => Ok(ExportKind::Gst),
            other => Err(DomainError::validation(format!(
                "export kind must be vouchers, ledgers or gst (got '{other}')"
            ))),
        }
    }
}

const VOUCHER_HEADERS: &[&str] = &[
    "Date", "Voucher Type", "Voucher No", "Status", "Ledger", "Debit", "Credit", "Narration", "Reference",
];
const LEDGER_HEADERS: &[&str] = &[
    "Name", "Group", "Code", "Opening Balance", "Dr/Cr", "Closing Balance", "GSTIN",
];
const GST_HEADERS: &[&str] = &[
    "Date", "Voucher Type", "Voucher No", "Party", "Taxable Value", "CGST", "SGST", "IGST", "Total",
];

fn date_cell(voucher: &Voucher) -> String {
    voucher.date.format("%Y-%m-%d").to_string()
}

fn side_label(side: EntryType) -> &'static str {
    match side {
        EntryType::Debit => "Dr",
        EntryType::Credit => "Cr",
    }
}

impl Books {
    #[instrument(skip(self), fields(tenant_id = %tenant_id, kind = ?kind))]
    pub async fn export_tally(&self, tenant_id: TenantId, kind: ExportKind) -> BooksResult<Workbook> {
        let sheet = match kind {
            ExportKind::Vouchers => {
                let vouchers = self.all_vouchers(tenant_id, &VoucherFilter::default()).await?;
                voucher_sheet(&vouchers)
            }
            ExportKind::Ledgers => ledger_sheet(&self.list_ledgers(tenant_id).await?),
            ExportKind::Gst => {
                let filter = VoucherFilter {
                    status: Some(VoucherStatus::Posted),
                    ..Default::default()
                };
                let vouchers = self.all_vouchers(tenant_id, &filter).await?;
                let ledgers = self.list_ledgers(tenant_id).await?;
                gst_sheet(&vouchers, &ledgers)?
            }
        };
        info!(rows = sheet.rows.len(), "tally export built");
        Ok(Workbook::new(vec![sheet]))
    }
}

fn voucher_sheet(vouchers: &[Voucher]) -> Sheet {
    let mut sheet = Sheet::new("Vouchers", VOUCHER_HEADERS);
    for voucher in vouchers {
        for entry in &voucher.entries {
            let amount = entry.amount.value().to_string();
            let (debit, credit) = match entry.entry_type {
                EntryType::Debit => (amount, String::new()),
                EntryType::Credit => (String::new(), amount),
            };
            sheet.push_row(vec![
                date_cell(voucher),
                voucher.voucher_type.display_name().to_string(),
                voucher.voucher_number.clone(),
                voucher.status.to_string(),
                entry.ledger_name.clone(),
                debit,
                credit,
                entry.narration.clone().or_else(|| voucher.narration.clone()).unwrap_or_default(),
                voucher.reference.clone().unwrap_or_default(),
            ]);
        }
    }
    sheet
}

fn ledger_sheet(ledgers: &[Ledger]) -> Sheet {
    let mut sheet = Sheet::new("Ledger", LEDGER_HEADERS);
    for ledger in ledgers {
        sheet.push_row(vec![
            ledger.name.clone(),
            group_for_subtype(ledger.subtype).to_string(),
            ledger.code.clone().unwrap_or_default(),
            ledger.opening_balance.to_string(),
            side_label(ledger.balance_type).to_string(),
            ledger.current_balance.to_string(),
            ledger.gstin.clone().unwrap_or_default(),
        ]);
    }
    sheet
}

#[derive(Debug, Default, PartialEq, Eq)]
struct TaxSplit {
    cgst: Decimal,
    sgst: Decimal,
    igst: Decimal,
}

impl TaxSplit {
    fn total(&self) -> DomainResult<Decimal> {
        checked_add(checked_add(self.cgst, self.sgst)?, self.igst)
    }
}

fn tax_split(voucher: &Voucher, ledgers: &HashMap<LedgerId, &Ledger>) -> DomainResult<TaxSplit> {
    let mut split = TaxSplit::default();
    for entry in &voucher.entries {
        let Some(ledger) = ledgers.get(&entry.ledger_id) else {
            continue;
        };
        if ledger.subtype != LedgerSubtype::DutiesTaxes {
            continue;
        }
        let name = ledger.name.to_ascii_uppercase();
        let amount = entry.amount.value();
        let bucket = if name.contains("CGST") {
            &mut split.cgst
        } else if name.contains("SGST") || name.contains("UTGST") {
            &mut split.sgst
        } else if name.contains("IGST") {
            &mut split.igst
        } else {
            continue;
        };
        *bucket = checked_add(*bucket, amount)?;
    }
    Ok(split)
}

fn party_name(voucher: &Voucher, ledgers: &HashMap<LedgerId, &Ledger>) -> String {
    voucher
        .party_ledger_id
        .and_then(|id| ledgers.get(&id))
        .or_else(|| {
            voucher
                .entries
                .iter()
                .filter_map(|e| ledgers.get(&e.ledger_id))
                .find(|l| l.subtype.is_party())
        })
        .map(|l| l.name.clone())
        .unwrap_or_default()
}

fn gst_sheet(vouchers: &[Voucher], ledgers: &[Ledger]) -> DomainResult<Sheet> {
    let by_id: HashMap<LedgerId, &Ledger> = ledgers.iter().map(|l| (l.id, l)).collect();
    let mut sheet = Sheet::new("GST", GST_HEADERS);
    for voucher in vouchers.iter().filter(|v| v.voucher_type.affects_gst()) {
        let split = tax_split(voucher, &by_id)?;
        let taxable = checked_sub(voucher.total_amount, split.total()?)?;
        sheet.push_row(vec![
            date_cell(voucher),
            voucher.voucher_type.display_name().to_string(),
            voucher.voucher_number.clone(),
            party_name(voucher, &by_id),
            taxable.to_string(),
            split.cgst.to_string(),
            split.sgst.to_string(),
            split.igst.to_string(),
            voucher.total_amount.to_string(),
        ]);
    }
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_kind_parses_path_segment() {
        assert_eq!("GST".parse::<ExportKind>().unwrap(), ExportKind::Gst);
        assert!("stock".parse::<ExportKind>().is_err());
    }

    #[test]
    fn tax_total_overflow_is_an_error() {
        let split = TaxSplit { cgst: Decimal::MAX, sgst: Decimal::ONE, igst: Decimal::ZERO };
        assert!(matches!(split.total(), Err(DomainError::Validation(_))));

        let fine = TaxSplit { cgst: Decimal::from(9), sgst: Decimal::from(9), igst: Decimal::ZERO };
        assert_eq!(fine.total().unwrap(), Decimal::from(18));
    }
}
