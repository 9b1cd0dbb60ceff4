use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerdesk_accounting::{
    BalanceSide, LedgerSubtype, NewLedger, NewNumberingSeries, SupplyKind, VoucherCategory, VoucherStatus,
};
use ledgerdesk_banking::{NewTransaction, TransactionFilter, TransactionType};
use ledgerdesk_core::{AccountId, Amount, DomainError, LedgerId};
use ledgerdesk_infra::{Page, Pagination, VoucherFilter};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateLedgerRequest {
    pub name: String,
    pub code: Option<String>,
    pub subtype: LedgerSubtype,
    pub balance_type: Option<BalanceSide>,
    #[serde(default)]
    pub opening_balance: Decimal,
    pub gstin: Option<String>,
}

impl From<CreateLedgerRequest> for NewLedger {
    fn from(req: CreateLedgerRequest) -> Self {
        NewLedger {
            name: req.name,
            code: req.code,
            subtype: req.subtype,
            balance_type: req.balance_type,
            opening_balance: req.opening_balance,
            gstin: req.gstin,
        }
    }
}

fn default_start_at() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CreateSeriesRequest {
    pub name: String,
    #[serde(alias = "voucher_type_id")]
    pub voucher_type: VoucherCategory,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub width: u8,
    #[serde(default = "default_start_at")]
    pub start_at: u64,
}

impl From<CreateSeriesRequest> for NewNumberingSeries {
    fn from(req: CreateSeriesRequest) -> Self {
        NewNumberingSeries {
            name: req.name,
            voucher_type: req.voucher_type,
            prefix: req.prefix,
            suffix: req.suffix,
            width: req.width,
            start_at: req.start_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(alias = "accountId")]
    pub account_id: AccountId,
    pub amount: Amount,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub description: String,
    pub date: Option<DateTime<Utc>>,
}

impl From<CreateTransactionRequest> for NewTransaction {
    fn from(req: CreateTransactionRequest) -> Self {
        NewTransaction {
            account_id: req.account_id,
            amount: req.amount,
            kind: req.kind,
            description: req.description,
            date: req.date,
        }
    }
}

/// Either `taxable_value` (tax-exclusive) or `gross_amount` (tax-inclusive).
#[derive(Debug, Deserialize)]
pub struct GstRequest {
    pub taxable_value: Option<Decimal>,
    pub gross_amount: Option<Decimal>,
    pub rate: Decimal,
    pub supply: SupplyKind,
}

#[derive(Debug, Deserialize)]
pub struct SheetCsv {
    pub name: String,
    pub csv: String,
}

#[derive(Debug, Deserialize)]
pub struct TallyImportRequest {
    pub sheets: Vec<SheetCsv>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

#[derive(Debug, Default, Deserialize)]
pub struct TallyExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
    /// CSV only: which sheet to return.
    pub sheet: Option<String>,
}

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListQuery {
    pub account_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl TransactionListQuery {
    pub fn into_filter(self) -> Result<(TransactionFilter, Pagination), axum::response::Response> {
        let account_id = self
            .account_id
            .as_deref()
            .map(errors::parse_id::<AccountId>)
            .transpose()?;
        let kind = self
            .kind
            .as_deref()
            .map(|k| k.parse::<TransactionType>())
            .transpose()
            .map_err(errors::domain_error_to_response)?;
        let start_date = self
            .start_date
            .as_deref()
            .map(|raw| parse_bound(raw, NaiveTime::MIN))
            .transpose()
            .map_err(errors::domain_error_to_response)?;
        let end_date = self
            .end_date
            .as_deref()
            .map(|raw| parse_bound(raw, end_of_day()))
            .transpose()
            .map_err(errors::domain_error_to_response)?;

        let filter = TransactionFilter {
            account_id,
            kind,
            start_date,
            end_date,
        };
        Ok((filter, Pagination::new(self.limit, self.offset)))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VoucherListQuery {
    pub status: Option<String>,
    #[serde(alias = "voucher_type_id")]
    pub voucher_type: Option<String>,
    pub ledger_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl VoucherListQuery {
    pub fn into_filter(self) -> Result<(VoucherFilter, Pagination), axum::response::Response> {
        let status = self
            .status
            .as_deref()
            .map(|s| s.parse::<VoucherStatus>())
            .transpose()
            .map_err(errors::domain_error_to_response)?;
        let voucher_type = self
            .voucher_type
            .as_deref()
            .map(|s| s.parse::<VoucherCategory>())
            .transpose()
            .map_err(errors::domain_error_to_response)?;
        let ledger_id = self
            .ledger_id
            .as_deref()
            .map(errors::parse_id::<LedgerId>)
            .transpose()?;

        let filter = VoucherFilter {
            status,
            voucher_type,
            ledger_id,
            from: self.from,
            to: self.to,
        };
        Ok((filter, Pagination::new(self.limit, self.offset)))
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
}

/// RFC 3339 timestamp, or a plain date taken at `time_of_day` UTC.
fn parse_bound(raw: &str, time_of_day: NaiveTime) -> Result<DateTime<Utc>, DomainError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(time_of_day).and_utc())
        .map_err(|_| DomainError::validation(format!("invalid date '{raw}' (expected YYYY-MM-DD or RFC 3339)")))
}

// -------------------------
// Success envelope
// -------------------------

pub fn ok<T: Serialize>(status: StatusCode, data: T) -> axum::response::Response {
    (
        status,
        axum::Json(serde_json::json!({
            "success": true,
            "data": data,
        })),
    )
        .into_response()
}

pub fn page<T: Serialize>(page: Page<T>) -> axum::response::Response {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({
            "success": true,
            "data": page.items,
            "pagination": {
                "total": page.total,
                "limit": page.limit,
                "offset": page.offset,
                "has_more": page.has_more,
            },
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_dates_bound_the_whole_day() {
        let start = parse_bound("2026-04-01", NaiveTime::MIN).unwrap();
        let end = parse_bound("2026-04-01", end_of_day()).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-04-01T00:00:00+00:00");
        assert!(end > start);
        assert!(parse_bound("01/04/2026", NaiveTime::MIN).is_err());
    }

    #[test]
    fn transaction_query_uses_camel_case_names() {
        let q: TransactionListQuery =
            serde_json::from_str(r#"{"accountId":"not-a-uuid","type":"DEBIT","limit":10}"#).unwrap();
        assert_eq!(q.kind.as_deref(), Some("DEBIT"));
        assert!(q.into_filter().is_err());
    }
}
