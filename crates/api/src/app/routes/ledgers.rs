use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
};

use ledgerdesk_auth::Permission;
use ledgerdesk_core::LedgerId;
use ledgerdesk_infra::Books;

use crate::app::routes::common::CmdAuth;
use crate::app::extract::ApiJson;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_ledgers).post(create_ledger))
        .route("/:id", get(get_ledger).delete(delete_ledger))
        .route("/:id/reconcile", get(reconcile_ledger))
}

pub async fn create_ledger(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(body): ApiJson<dto::CreateLedgerRequest>,
) -> Response {
    let body = match CmdAuth::wrap(body, Permission::LEDGERS_WRITE).check(&ctx) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    match books.create_ledger(ctx.tenant_id(), body.into()).await {
        Ok(ledger) => dto::ok(StatusCode::CREATED, ledger),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn list_ledgers(Extension(books): Extension<Books>, Extension(ctx): Extension<RequestContext>) -> Response {
    match books.list_ledgers(ctx.tenant_id()).await {
        Ok(items) => dto::ok(StatusCode::OK, items),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn get_ledger(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let id: LedgerId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match books.get_ledger(ctx.tenant_id(), id).await {
        Ok(ledger) => dto::ok(StatusCode::OK, ledger),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn delete_ledger(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let id: LedgerId = match CmdAuth::wrap(id, Permission::LEDGERS_WRITE)
        .check(&ctx)
        .and_then(|raw| errors::parse_id(&raw))
    {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match books.delete_ledger(ctx.tenant_id(), id).await {
        Ok(()) => dto::ok(StatusCode::OK, serde_json::json!({ "id": id, "deleted": true })),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn reconcile_ledger(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let id: LedgerId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match books.reconcile_ledger(ctx.tenant_id(), id).await {
        Ok(result) => dto::ok(StatusCode::OK, result),
        Err(e) => errors::books_error_to_response(e),
    }
}
