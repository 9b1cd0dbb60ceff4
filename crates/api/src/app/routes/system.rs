use axum::{extract::Extension, http::StatusCode, response::Response};

use crate::app::dto;
use crate::context::RequestContext;

pub async fn health() -> Response {
    dto::ok(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

pub async fn whoami(Extension(ctx): Extension<RequestContext>) -> Response {
    dto::ok(
        StatusCode::OK,
        serde_json::json!({
            "tenant_id": ctx.tenant_id().to_string(),
            "principal_id": ctx.principal_id().to_string(),
            "roles": ctx.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        }),
    )
}
