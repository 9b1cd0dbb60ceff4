use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::get,
};

use ledgerdesk_auth::Permission;
use ledgerdesk_core::TransactionId;
use ledgerdesk_infra::Books;

use crate::app::routes::common::CmdAuth;
use crate::app::extract::ApiJson;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_transactions).post(create_transaction))
        .route("/:id", get(get_transaction).delete(delete_transaction))
}

pub async fn create_transaction(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(body): ApiJson<dto::CreateTransactionRequest>,
) -> Response {
    let body = match CmdAuth::wrap(body, Permission::TRANSACTIONS_WRITE).check(&ctx) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    match books.create_transaction(ctx.tenant_id(), body.into()).await {
        Ok(tx) => dto::ok(StatusCode::CREATED, tx),
        Err(e) => errors::books_error_to_response(e),
    }
}

/// `?accountId&type&startDate&endDate&limit&offset`
pub async fn list_transactions(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::TransactionListQuery>,
) -> Response {
    let (filter, pagination) = match query.into_filter() {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match books.list_transactions(ctx.tenant_id(), &filter, pagination).await {
        Ok(page) => dto::page(page),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn get_transaction(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let id: TransactionId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match books.get_transaction(ctx.tenant_id(), id).await {
        Ok(tx) => dto::ok(StatusCode::OK, tx),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn delete_transaction(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let id: TransactionId = match CmdAuth::wrap(id, Permission::TRANSACTIONS_WRITE)
        .check(&ctx)
        .and_then(|raw| errors::parse_id(&raw))
    {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match books.delete_transaction(ctx.tenant_id(), id).await {
        Ok(tx) => dto::ok(StatusCode::OK, tx),
        Err(e) => errors::books_error_to_response(e),
    }
}
