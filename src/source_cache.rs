//! Source Cache — a short-lived memo of blob-store lookups by id, so
//! that coalesced renditions of the same source image (same id,
//! different dimensions) do not each pay a full blob-store round trip.
//! Distinct from the coalescing result cache in `cache.rs`: this caches
//! decode inputs, not render outputs, and is sized and timed far more
//! loosely.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use moka::sync::Cache;

use crate::store::{BlobStore, StoreError};

const SOURCE_CACHE_CAPACITY: u64 = 10_000;
const SOURCE_CACHE_TTL: Duration = Duration::from_secs(600);

pub struct SourceCache {
    store: Arc<dyn BlobStore>,
    cache: Cache<String, Bytes>,
}

impl SourceCache {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_capacity_and_ttl(store, SOURCE_CACHE_CAPACITY, SOURCE_CACHE_TTL)
    }

    pub fn with_capacity_and_ttl(
        store: Arc<dyn BlobStore>,
        capacity: u64,
        ttl: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { store, cache }
    }

    /// Fetch source bytes for `id`, memoized. The underlying blob-store
    /// call runs synchronously on the calling thread; per spec.md §2's
    /// data flow, resolving source bytes happens before a job is
    /// enqueued, not inside a worker, so this is called directly from the
    /// async request path — cheap enough relative to rendering that it
    /// does not need its own thread hop.
    pub fn get(&self, id: &str) -> Result<Bytes, StoreError> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit);
        }
        let bytes = self.store.get(id)?;
        self.cache.insert(id.to_string(), bytes.clone());
        Ok(bytes)
    }
}
