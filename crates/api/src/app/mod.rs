//! HTTP API application wiring (Axum router + books service).
//!
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/query DTOs and the success envelope
//! - `extract.rs`: JSON body extractor that answers with the error envelope
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use ledgerdesk_infra::Books;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;

/// Router over a fresh in-memory store.
pub fn build_app(jwt_secret: String) -> Router {
    build_app_with(jwt_secret, Books::in_memory())
}

/// Full HTTP router over the given books service (public entrypoint used by `main.rs`).
pub fn build_app_with(jwt_secret: String, books: Books) -> Router {
    let jwt = Arc::new(ledgerdesk_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require auth + tenant context.
    let protected = routes::router()
        .layer(Extension(books))
        .layer(axum::middleware::from_fn_with_state(auth_state, middleware::auth_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
