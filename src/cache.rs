//! Coalescing Cache — the request-deduplication layer sitting in front
//! of the worker queue. Two responsibilities live here:
//!
//! - an in-flight map collapsing concurrent identical requests (same
//!   fingerprint) into a single computation, so a thundering herd for
//!   one popular rendition costs one worker slot instead of N;
//! - a TTL + capacity-bounded result cache so a repeat request shortly
//!   after the first never touches a worker at all.
//!
//! The in-flight map is a [`DashMap`] keyed by fingerprint, holding a
//! `broadcast::Sender<()>` used as a one-shot wake signal: the first
//! caller for a fingerprint becomes the producer and inserts the entry;
//! every caller that arrives while it is still there becomes a waiter,
//! subscribes, and blocks on the broadcast instead of `Notify`, which
//! cannot guarantee a signal sent before a waiter subscribes is not
//! lost.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use moka::sync::Cache;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::fingerprint::Fingerprint;

const RESULT_CACHE_CAPACITY: u64 = 75_000;
const RESULT_CACHE_TTL: Duration = Duration::from_secs(300);

enum Role {
    Producer,
    Waiter(broadcast::Receiver<()>),
}

pub struct CoalescingCache {
    results: Cache<Fingerprint, Bytes>,
    in_flight: DashMap<Fingerprint, broadcast::Sender<()>>,
}

impl CoalescingCache {
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(RESULT_CACHE_CAPACITY, RESULT_CACHE_TTL)
    }

    pub fn with_capacity_and_ttl(capacity: u64, ttl: Duration) -> Self {
        let results = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self {
            results,
            in_flight: DashMap::new(),
        }
    }

    /// Resolve `fingerprint`, computing via `compute` at most once across
    /// however many concurrent callers ask for it. Callers racing a
    /// client-driven cancellation pass it as `cancel`; a cancelled waiter
    /// returns early without affecting the in-progress producer.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: Fingerprint,
        cancel: CancellationToken,
        compute: F,
    ) -> Result<Bytes, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Bytes, AppError>>,
    {
        if let Some(bytes) = self.results.get(&fingerprint) {
            metrics::counter!("counter_imageapi_cache_hits").increment(1);
            return Ok(bytes);
        }
        metrics::counter!("counter_imageapi_cache_misses").increment(1);

        let mut compute = Some(compute);
        loop {
            match self.join(&fingerprint) {
                Role::Producer => {
                    let compute = compute
                        .take()
                        .expect("producer role is only taken once per call");
                    metrics::counter!("counter_imageapi_requests_processed").increment(1);
                    let result = compute().await;
                    if let Ok(bytes) = &result {
                        self.results.insert(fingerprint.clone(), bytes.clone());
                        metrics::gauge!("gauge_imageapi_cache_size")
                            .set(self.results.entry_count() as f64);
                    }
                    self.finish(&fingerprint);
                    return result;
                }
                Role::Waiter(mut rx) => {
                    metrics::counter!("counter_imageapi_requests_coalesced").increment(1);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(AppError::Cancelled),
                        woken = rx.recv() => {
                            let _ = woken;
                            if let Some(bytes) = self.results.get(&fingerprint) {
                                return Ok(bytes);
                            }
                            // The producer finished without populating the
                            // cache (it failed). Loop and contend to become
                            // the producer ourselves.
                        }
                    }
                }
            }
        }
    }

    fn join(&self, fingerprint: &Fingerprint) -> Role {
        match self.in_flight.entry(fingerprint.clone()) {
            Entry::Occupied(existing) => Role::Waiter(existing.get().subscribe()),
            Entry::Vacant(slot) => {
                let (tx, _rx) = broadcast::channel(1);
                slot.insert(tx);
                Role::Producer
            }
        }
    }

    fn finish(&self, fingerprint: &Fingerprint) {
        if let Some((_, tx)) = self.in_flight.remove(fingerprint) {
            let _ = tx.send(());
        }
    }
}

impl Default for CoalescingCache {
    fn default() -> Self {
        Self::new()
    }
}
