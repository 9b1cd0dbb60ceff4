//! Request body extraction with the API's error envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::Response;
use serde::de::DeserializeOwned;

use crate::app::errors;

/// `axum::Json`, except a body that does not parse (bad syntax, wrong
/// content type, or a value the DTO refuses such as a non-positive amount)
/// becomes a 400 `validation_error` instead of axum's plain-text rejection.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(rejection_to_response(rejection)),
        }
    }
}

fn rejection_to_response(rejection: JsonRejection) -> Response {
    tracing::debug!(status = %rejection.status(), "rejected request body");
    errors::json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}
