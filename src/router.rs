//! Router construction: one route, wrapped in the middleware chain
//! (outer to inner) Tracer/Request-Log → Metrics → Timeout → Panic
//! Recovery → CORS → handler.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{middleware as axum_mw, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::CoalescingCache;
use crate::handlers;
use crate::middleware::{logging, metrics, timeout};
use crate::processor::ImageProcessor;
use crate::signer::Signer;

pub struct AppState {
    pub signer: Signer,
    pub cache: CoalescingCache,
    pub processor: Arc<ImageProcessor>,
}

pub fn build_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/id/:id/:width/:height_ext", get(handlers::image::render))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::new())
        .layer(axum_mw::from_fn(move |request, next| {
            timeout::enforce(request_timeout, request, next)
        }))
        .layer(axum_mw::from_fn(metrics::track))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(logging::make_span)
                .on_request(logging::on_request)
                .on_response(logging::on_response),
        )
}
