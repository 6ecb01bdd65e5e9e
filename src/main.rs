//! image-service — standalone HTTP server for dynamic image renditions.
//!
//! Reads config from CLI flags or `IMAGE_`-prefixed environment
//! variables; see [`image_service::config::Config`].

use std::sync::Arc;

use clap::Parser;
use image_service::cache::CoalescingCache;
use image_service::config::Config;
use image_service::processor::ImageProcessor;
use image_service::router::{build_router, AppState};
use image_service::signer::Signer;
use image_service::source_cache::SourceCache;
use image_service::store::{LocalBlobStore, LocalImageLibrary};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    image_service::telemetry::init(&config.log_level);

    let blob_store = Arc::new(LocalBlobStore::new(config.storage_path.clone()));
    let source_cache = Arc::new(SourceCache::with_capacity_and_ttl(
        blob_store,
        config.source_cache_capacity,
        config.source_ttl(),
    ));
    let processor = Arc::new(ImageProcessor::new(
        config.workers,
        source_cache,
        Arc::new(LocalImageLibrary),
    ));

    let state = Arc::new(AppState {
        signer: Signer::new(config.hmac_key.clone().into_bytes()),
        cache: CoalescingCache::with_capacity_and_ttl(config.cache_capacity, config.cache_ttl()),
        processor,
    });

    let app = build_router(state, config.request_timeout());

    let listener = TcpListener::bind(&config.listen)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {}: {e}", config.listen));
    tracing::info!(listen = %config.listen, workers = config.workers, "image-service listening");

    axum::serve(listener, app).await.expect("server error");
}
