//! Expvar-style request counters, incremented around every request
//! regardless of outcome. Per-outcome counters (cache hits/misses,
//! coalescing, queue-full) are incremented closer to where they happen,
//! in `cache.rs` and `error.rs`.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

pub async fn track(request: Request, next: Next) -> Response {
    metrics::counter!("counter_imageapi_requests_total").increment(1);
    next.run(request).await
}
