//! Axum router wiring.
//!
//! Dashboard datasource contract on `/`, `/search`, `/query`, `/annotations`,
//! plus operational endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, ops, transport::http};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(http::hello))
        .route("/search", post(http::search).options(http::preflight))
        .route("/query", post(http::query).options(http::preflight))
        .route(
            "/annotations",
            get(http::annotations_probe)
                .post(http::annotations)
                .options(http::preflight),
        )
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
