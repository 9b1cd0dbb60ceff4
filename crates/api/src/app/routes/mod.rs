use axum::{Router, routing::get};

pub mod accounts;
pub mod common;
pub mod gst;
pub mod ledgers;
pub mod system;
pub mod tally;
pub mod transactions;
pub mod vouchers;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/ledgers", ledgers::router())
        .nest("/vouchers", vouchers::router())
        .nest("/accounts", accounts::router())
        .nest("/transactions", transactions::router())
        .nest("/gst", gst::router())
        .nest("/tally", tally::router())
}
