// =============================================================================
// Error taxonomy — crate-wide AppError
// =============================================================================
//
// Realizes the HTTP-facing error taxonomy: every handler returns
// `Result<T, AppError>` and the envelope below is the only error shape a
// client ever sees. Internal algorithmic modules keep using `anyhow::Result`
// and are adapted to `AppError` only at this boundary.
// =============================================================================

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream contract violation: {0}")]
    UpstreamContract(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependency_status_code: Option<u16>,
}

impl AppError {
    fn status_and_envelope(&self) -> (StatusCode, ErrorEnvelope) {
        match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorEnvelope {
                    error: "bad_request".into(),
                    details: Some(msg.clone()),
                    dependency_status_code: None,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorEnvelope {
                    error: "not_found".into(),
                    details: Some(msg.clone()),
                    dependency_status_code: None,
                },
            ),
            AppError::UpstreamContract(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorEnvelope {
                    error: "upstream_contract_violation".into(),
                    details: Some(msg.clone()),
                    dependency_status_code: Some(502),
                },
            ),
            AppError::UpstreamUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorEnvelope {
                    error: "upstream_unavailable".into(),
                    details: Some(msg.clone()),
                    dependency_status_code: Some(503),
                },
            ),
            AppError::UpstreamTimeout(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorEnvelope {
                    error: "upstream_timeout".into(),
                    details: Some(msg.clone()),
                    dependency_status_code: Some(504),
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorEnvelope {
                    error: "internal_error".into(),
                    details: Some(msg.clone()),
                    dependency_status_code: None,
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, envelope) = self.status_and_envelope();
        (status, Json(envelope)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::Internal(format!("database error: {err}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::UpstreamTimeout(err.to_string())
        } else if err.is_connect() {
            AppError::UpstreamUnavailable(err.to_string())
        } else {
            AppError::UpstreamContract(err.to_string())
        }
    }
}
