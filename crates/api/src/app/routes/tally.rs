use axum::{
    Router,
    body::Bytes,
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use ledgerdesk_auth::Permission;
use ledgerdesk_infra::Books;
use ledgerdesk_infra::tally::{ExportKind, Sheet, Workbook, XLSX_CONTENT_TYPE};

use crate::app::routes::common::CmdAuth;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/export/:kind", get(export))
        .route("/import", post(import))
}

fn attachment(content_type: &str, filename: String, body: impl IntoResponse) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response()
}

/// The export as an `.xlsx` workbook, or with `?format=csv` one sheet as
/// `text/csv` (`?sheet=` picks it by name).
pub async fn export(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Path(kind): Path<String>,
    Query(query): Query<dto::TallyExportQuery>,
) -> Response {
    let kind: ExportKind = match CmdAuth::wrap(kind, Permission::TALLY_EXPORT)
        .check(&ctx)
        .and_then(|raw| raw.parse().map_err(errors::domain_error_to_response))
    {
        Ok(k) => k,
        Err(resp) => return resp,
    };

    let book = match books.export_tally(ctx.tenant_id(), kind).await {
        Ok(b) => b,
        Err(e) => return errors::books_error_to_response(e),
    };

    if query.format == dto::ExportFormat::Xlsx {
        let filename = match book.sheets.first() {
            Some(sheet) => format!("{}.xlsx", sheet.name),
            None => "export.xlsx".to_string(),
        };
        return match book.to_xlsx() {
            Ok(bytes) => attachment(XLSX_CONTENT_TYPE, filename, bytes),
            Err(e) => errors::domain_error_to_response(e),
        };
    }

    let sheet = match &query.sheet {
        Some(name) => book.sheet(&[name.as_str()]),
        None => book.sheets.first(),
    };
    let Some(sheet) = sheet else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "sheet not found");
    };

    match sheet.to_csv() {
        Ok(text) => attachment("text/csv; charset=utf-8", format!("{}.csv", sheet.name), text),
        Err(e) => errors::domain_error_to_response(e),
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("application/json"))
}

/// Parse an uploaded workbook: raw `.xlsx` bytes, or a JSON body of CSV sheets.
fn workbook_from_body(headers: &HeaderMap, body: &[u8]) -> Result<Workbook, Response> {
    if !is_json(headers) {
        return Workbook::from_xlsx(body).map_err(errors::domain_error_to_response);
    }

    let request: dto::TallyImportRequest = serde_json::from_slice(body)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()))?;
    let mut sheets = Vec::with_capacity(request.sheets.len());
    for sheet in request.sheets {
        sheets.push(Sheet::from_csv(sheet.name, &sheet.csv).map_err(errors::domain_error_to_response)?);
    }
    Ok(Workbook::new(sheets))
}

pub async fn import(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(resp) = CmdAuth::new(Permission::TALLY_IMPORT).check(&ctx) {
        return resp;
    }
    let book = match workbook_from_body(&headers, &body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match books.import_tally(ctx.tenant_id(), &book).await {
        Ok(report) => dto::ok(StatusCode::OK, report),
        Err(e) => errors::books_error_to_response(e),
    }
}
