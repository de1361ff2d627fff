//! HTTP mapping for request-level errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use rrdserve_core::error::RrdServeError;

use super::http::CORS_HEADERS;

/// Request-level failure rendered as `{"error": CODE, "message": text}`.
#[derive(Debug)]
pub struct ApiError(pub RrdServeError);

impl From<RrdServeError> for ApiError {
    fn from(e: RrdServeError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            RrdServeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RrdServeError::RequestTimeout => StatusCode::GATEWAY_TIMEOUT,
            RrdServeError::CatalogUnavailable(_)
            | RrdServeError::Config(_)
            | RrdServeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        (status, CORS_HEADERS, body).into_response()
    }
}
