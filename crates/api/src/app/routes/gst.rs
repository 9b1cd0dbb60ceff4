use axum::{Router, http::StatusCode, response::Response, routing::post};

use ledgerdesk_accounting::{compute_gst, from_inclusive};

use crate::app::extract::ApiJson;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/compute", post(compute))
}

pub async fn compute(ApiJson(body): ApiJson<dto::GstRequest>) -> Response {
    let result = match (body.taxable_value, body.gross_amount) {
        (Some(taxable), None) => compute_gst(taxable, body.rate, body.supply),
        (None, Some(gross)) => from_inclusive(gross, body.rate, body.supply),
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "provide exactly one of taxable_value or gross_amount",
            );
        }
    };
    match result {
        Ok(breakdown) => dto::ok(StatusCode::OK, breakdown),
        Err(e) => errors::domain_error_to_response(e),
    }
}
