//! Error handling for the axum server.
//! Maps [`AppError`] to the HTTP status codes and JSON bodies defined in
//! the service's error handling design (signature/parameter errors → 400,
//! queue-full/timeout → 503, everything else upstream → 500).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::queue::QueueError;

/// Domain-level error surfaced by the core pipeline.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("queue full")]
    QueueFull,

    #[error("request cancelled")]
    Cancelled,

    #[error("upstream failure: {0}")]
    Upstream(#[from] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<QueueError> for AppError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::QueueFull => AppError::QueueFull,
            QueueError::Shutdown => AppError::Internal("worker pool shut down".into()),
            QueueError::Cancelled => AppError::Cancelled,
        }
    }
}

/// Severity the request-log middleware should use when it sees this
/// error's response come back through, carried out-of-band via a
/// response extension since the tower-http trace layer only sees the
/// `Response`, not the `AppError` that produced it.
#[derive(Debug, Clone, Copy)]
pub enum LogSeverity {
    Debug,
    Info,
    Error,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidSignature => StatusCode::BAD_REQUEST,
            AppError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            AppError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            // The source's exact behavior: a caller cancelled while waiting
            // surfaces as an internal error, not a client-facing 4xx.
            AppError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// A cancelled wait is an unremarkable client disconnect, not a
    /// service fault, even though it surfaces on a 5xx status: it logs
    /// at info. Everything else server-side logs as an error.
    fn log_severity(&self) -> LogSeverity {
        match self {
            AppError::InvalidSignature | AppError::InvalidParameters(_) => LogSeverity::Debug,
            AppError::Cancelled => LogSeverity::Info,
            AppError::QueueFull | AppError::Upstream(_) | AppError::Internal(_) => {
                LogSeverity::Error
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let severity = self.log_severity();

        match severity {
            LogSeverity::Error => {
                tracing::error!(error = %self, status = status.as_u16(), "request failed")
            }
            LogSeverity::Info => {
                tracing::info!(error = %self, status = status.as_u16(), "request cancelled")
            }
            LogSeverity::Debug => {
                tracing::debug!(error = %self, status = status.as_u16(), "request rejected")
            }
        }

        if matches!(self, AppError::QueueFull) {
            metrics::counter!("counter_imageapi_queue_full_errors").increment(1);
        }

        let body = json!({ "error": self.to_string() });
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(severity);
        response
    }
}
