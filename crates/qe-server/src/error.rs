//! Maps the core's layered error taxonomy to HTTP responses (§7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub enum ApiError {
    /// Validation errors are client-caused (§7): HTTP 400.
    BadRequest(String),
    /// Planning/build/execution errors are internal (§7): HTTP 500.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<qe_plan::ValidationError> for ApiError {
    fn from(err: qe_plan::ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<qe_plan::PlanError> for ApiError {
    fn from(err: qe_plan::PlanError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<qe_sql::BuildError> for ApiError {
    fn from(err: qe_sql::BuildError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<qe_doc::BuildError> for ApiError {
    fn from(err: qe_doc::BuildError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<qe_exec::ExecError> for ApiError {
    fn from(err: qe_exec::ExecError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
