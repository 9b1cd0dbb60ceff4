use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
};

use ledgerdesk_auth::Permission;
use ledgerdesk_banking::NewBankAccount;
use ledgerdesk_core::AccountId;
use ledgerdesk_infra::Books;

use crate::app::routes::common::CmdAuth;
use crate::app::extract::ApiJson;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_accounts).post(create_account))
        .route("/:id", get(get_account))
}

pub async fn create_account(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(body): ApiJson<NewBankAccount>,
) -> Response {
    let body = match CmdAuth::wrap(body, Permission::TRANSACTIONS_WRITE).check(&ctx) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    match books.create_account(ctx.tenant_id(), body).await {
        Ok(account) => dto::ok(StatusCode::CREATED, account),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn list_accounts(Extension(books): Extension<Books>, Extension(ctx): Extension<RequestContext>) -> Response {
    match books.list_accounts(ctx.tenant_id()).await {
        Ok(items) => dto::ok(StatusCode::OK, items),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn get_account(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let id: AccountId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match books.get_account(ctx.tenant_id(), id).await {
        Ok(account) => dto::ok(StatusCode::OK, account),
        Err(e) => errors::books_error_to_response(e),
    }
}
