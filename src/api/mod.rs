//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::http::HeaderName;
use axum::routing::get;
use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::TransferHandler;
use crate::store::LedgerStore;

pub use routes::create_router;

/// Build the full application router over a ledger backend
pub fn build_router<S: LedgerStore>(handler: TransferHandler<S>) -> Router {
    let request_id = HeaderName::from_static(middleware::REQUEST_ID_HEADER);

    // Layers run bottom-up: request id -> trace -> logging -> handler
    let api_router = create_router::<S>().layer(axum::middleware::from_fn(
        middleware::logging_middleware,
    ));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .merge(api_router)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(handler)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
