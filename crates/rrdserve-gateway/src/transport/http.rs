//! Dashboard-facing HTTP handlers.
//!
//! Responsibilities:
//! - Decode bodies once via `codec`, then hand validated values to the
//!   catalog, query engine or annotation store.
//! - Attach the literal CORS headers the dashboard expects.
//! - Count every request by endpoint and status.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::transport::codec::{self, AnnotationWire};
use crate::transport::error::ApiError;

pub const CORS_HEADERS: [(HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "accept, content-type"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "GET,POST,HEAD,OPTIONS"),
];

type ApiResult<T> = std::result::Result<T, ApiError>;

fn record<T>(state: &AppState, endpoint: &str, res: &ApiResult<T>) {
    let status = match res {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    };
    state
        .metrics()
        .requests
        .inc(&[("endpoint", endpoint), ("status", status.as_str())]);
}

/// `GET /` liveness probe used by the datasource "test" button.
pub async fn hello() -> impl IntoResponse {
    Json(json!({ "message": "hello" }))
}

/// `OPTIONS` preflight for every dashboard endpoint.
pub async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, CORS_HEADERS)
}

/// `POST /search`: metric ids starting with the typed prefix.
pub async fn search(State(state): State<AppState>, body: Bytes) -> ApiResult<impl IntoResponse> {
    let res = async {
        let req = codec::decode_search(&body)?;
        let found = state.catalog().search(&req.target).await?;
        Ok::<_, ApiError>(found)
    }
    .await;
    record(&state, "search", &res);
    if let Err(e) = &res {
        tracing::error!(error = %e.0, "search failed");
    }
    Ok((CORS_HEADERS, Json(res?)))
}

/// `POST /query`: resampled series for every visible target, in input order.
pub async fn query(State(state): State<AppState>, body: Bytes) -> ApiResult<impl IntoResponse> {
    let res = async {
        let req = codec::decode_query(&body)?;
        let out = state.engine().handle(req).await?;
        Ok::<_, ApiError>(out)
    }
    .await;
    record(&state, "query", &res);
    if let Err(e) = &res {
        tracing::warn!(error = %e.0, code = e.0.client_code().as_str(), "query rejected");
    }
    Ok((CORS_HEADERS, Json(res?)))
}

/// `GET /annotations`: placeholder body kept for datasource health checks.
pub async fn annotations_probe() -> impl IntoResponse {
    Json(json!({ "message": "annotations" }))
}

/// `POST /annotations`: stored events intersecting the requested range.
pub async fn annotations(State(state): State<AppState>, body: Bytes) -> ApiResult<impl IntoResponse> {
    let res = codec::decode_annotations(&body).map_err(ApiError::from);
    record(&state, "annotations", &res);
    let (range, query) = res?;

    let out: Vec<AnnotationWire<'_>> = state
        .annotations()
        .get(range)
        .into_iter()
        .map(|a| AnnotationWire::new(&query, a))
        .collect();
    let body: Value = serde_json::to_value(out)
        .map_err(|e| ApiError(rrdserve_core::RrdServeError::Internal(format!("encode annotations: {e}"))))?;
    Ok((CORS_HEADERS, Json(body)))
}
