//! Runtime configuration, loaded from CLI flags or `IMAGE_`-prefixed
//! environment variables.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "image-service", about = "Dynamic image rendition service")]
pub struct Config {
    /// Address the HTTP server listens on.
    #[arg(long, env = "IMAGE_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Address the expvar-style metrics endpoint listens on, served
    /// separately from the main traffic listener per spec.md §6. The
    /// metrics sink itself is an out-of-scope collaborator (spec.md §1);
    /// this flag is accepted and validated for completeness even though
    /// this crate does not stand up the exporter.
    #[arg(long, env = "IMAGE_METRICS_LISTEN", default_value = "0.0.0.0:9090")]
    pub metrics_listen: String,

    /// `tracing_subscriber::EnvFilter` directive, e.g. "info" or
    /// "image_service=debug,tower_http=info".
    #[arg(long, env = "IMAGE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Directory backing the stand-in blob store.
    #[arg(long, env = "IMAGE_STORAGE_PATH", default_value = "./data")]
    pub storage_path: PathBuf,

    /// Shared HMAC signing key. Required; the process refuses to start
    /// without one since an empty key would accept any signature.
    #[arg(long, env = "IMAGE_HMAC_KEY")]
    pub hmac_key: String,

    /// Number of pinned worker threads backing the render queue.
    #[arg(long, env = "IMAGE_WORKERS", default_value_t = num_cpus())]
    pub workers: usize,

    /// Result-cache capacity (distinct fingerprints held at once).
    #[arg(long, env = "IMAGE_CACHE_CAPACITY", default_value_t = 75_000)]
    pub cache_capacity: u64,

    /// Result-cache time-to-live, in seconds.
    #[arg(long, env = "IMAGE_CACHE_TTL_SECS", default_value_t = 300)]
    pub cache_ttl_secs: u64,

    /// Per-request processing timeout, in seconds.
    #[arg(long, env = "IMAGE_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,

    /// Source-bytes cache capacity (distinct source ids held at once).
    #[arg(long, env = "IMAGE_SOURCE_CACHE_CAPACITY", default_value_t = 10_000)]
    pub source_cache_capacity: u64,

    /// Source-bytes cache time-to-live, in seconds.
    #[arg(long, env = "IMAGE_SOURCE_TTL_SECS", default_value_t = 600)]
    pub source_ttl_secs: u64,
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Config {
    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn source_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.source_ttl_secs)
    }
}
