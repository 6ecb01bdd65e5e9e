//! Logging and metrics bootstrap. Tracing is wired to stdout as
//! newline-delimited fields via `tracing_subscriber`; the `metrics`
//! facade is left to whatever recorder the binary installs (the
//! counters and gauges used throughout — `counter_imageapi_*`,
//! `gauge_imageapi_cache_size` — are named to match spec.md §6's
//! expvar-style inventory regardless of which recorder is wired in).

use tracing_subscriber::EnvFilter;

pub fn init(log_level: &str) {
    let filter =
        EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
