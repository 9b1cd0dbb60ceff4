use axum::{
    Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};

use ledgerdesk_accounting::VoucherDeletion;
use ledgerdesk_auth::Permission;
use ledgerdesk_core::VoucherId;
use ledgerdesk_infra::{Books, EditDraft, PostVoucher};

use crate::app::routes::common::CmdAuth;
use crate::app::extract::ApiJson;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_vouchers).post(create_voucher))
        .route("/types", get(list_voucher_types))
        .route("/series", get(list_series).post(create_series))
        .route("/:id", get(get_voucher).put(update_draft).delete(delete_voucher))
        .route("/:id/post", post(post_draft))
}

fn voucher_id(raw: &str) -> Result<VoucherId, Response> {
    errors::parse_id(raw)
}

pub async fn create_voucher(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(body): ApiJson<PostVoucher>,
) -> Response {
    let body = match CmdAuth::wrap(body, Permission::VOUCHERS_WRITE).check(&ctx) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    match books.post_voucher(ctx.tenant_id(), body).await {
        Ok(voucher) => dto::ok(StatusCode::CREATED, voucher),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn list_vouchers(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::VoucherListQuery>,
) -> Response {
    let (filter, pagination) = match query.into_filter() {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match books.list_vouchers(ctx.tenant_id(), &filter, pagination).await {
        Ok(page) => dto::page(page),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn get_voucher(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match voucher_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match books.get_voucher(ctx.tenant_id(), id).await {
        Ok(voucher) => dto::ok(StatusCode::OK, voucher),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn update_draft(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<EditDraft>,
) -> Response {
    let (id, body) = match CmdAuth::wrap(body, Permission::VOUCHERS_WRITE)
        .check(&ctx)
        .and_then(|body| Ok((voucher_id(&id)?, body)))
    {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match books.update_draft(ctx.tenant_id(), id, body).await {
        Ok(voucher) => dto::ok(StatusCode::OK, voucher),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn post_draft(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match CmdAuth::wrap(id, Permission::VOUCHERS_POST)
        .check(&ctx)
        .and_then(|raw| voucher_id(&raw))
    {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match books.post_draft(ctx.tenant_id(), id).await {
        Ok(voucher) => dto::ok(StatusCode::OK, voucher),
        Err(e) => errors::books_error_to_response(e),
    }
}

/// Drafts are discarded; posted vouchers are reversed and kept as REVERSED.
pub async fn delete_voucher(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match CmdAuth::wrap(id, Permission::VOUCHERS_WRITE)
        .check(&ctx)
        .and_then(|raw| voucher_id(&raw))
    {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match books.delete_voucher(ctx.tenant_id(), id).await {
        Ok(removed) => {
            let action = match removed.deletion {
                VoucherDeletion::DiscardDraft => "discarded",
                VoucherDeletion::ReversePosted => "reversed",
            };
            dto::ok(
                StatusCode::OK,
                serde_json::json!({ "action": action, "voucher": removed.voucher }),
            )
        }
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn list_voucher_types(Extension(books): Extension<Books>) -> Response {
    dto::ok(StatusCode::OK, books.voucher_types())
}

pub async fn create_series(
    Extension(books): Extension<Books>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(body): ApiJson<dto::CreateSeriesRequest>,
) -> Response {
    let body = match CmdAuth::wrap(body, Permission::VOUCHERS_WRITE).check(&ctx) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    match books.create_series(ctx.tenant_id(), body.into()).await {
        Ok(series) => dto::ok(StatusCode::CREATED, series),
        Err(e) => errors::books_error_to_response(e),
    }
}

pub async fn list_series(Extension(books): Extension<Books>, Extension(ctx): Extension<RequestContext>) -> Response {
    match books.list_series(ctx.tenant_id()).await {
        Ok(items) => dto::ok(StatusCode::OK, items),
        Err(e) => errors::books_error_to_response(e),
    }
}
