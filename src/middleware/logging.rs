//! Request logging helpers for the `TraceLayer` wired into the router.
//! Severity comes from the [`LogSeverity`] an error response carries in
//! its extensions (falling back to status-code heuristics for
//! responses that never passed through [`AppError`]), so a cancelled
//! wait logs as routine and a genuine server fault logs as an error
//! even though both can carry a 5xx status.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use tracing::Span;

use crate::error::LogSeverity;

pub fn make_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

pub fn on_request(_request: &Request<Body>, _span: &Span) {
    tracing::debug!("request received");
}

pub fn on_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    let status = response.status();
    let severity = response
        .extensions()
        .get::<LogSeverity>()
        .copied()
        .unwrap_or_else(|| default_severity(status));

    let latency_ms = latency.as_millis() as u64;
    match severity {
        LogSeverity::Error => {
            tracing::error!(status = status.as_u16(), latency_ms, "request completed")
        }
        LogSeverity::Info => {
            tracing::info!(status = status.as_u16(), latency_ms, "request completed")
        }
        LogSeverity::Debug => {
            tracing::debug!(status = status.as_u16(), latency_ms, "request completed")
        }
    }
}

fn default_severity(status: StatusCode) -> LogSeverity {
    if status.is_server_error() {
        LogSeverity::Error
    } else {
        LogSeverity::Debug
    }
}
