//! image-service — dynamic image resizing/encoding HTTP service.
//!
//! One route: `GET /id/:id/:width/:height:extension`. Requests are
//! signature-checked, parsed, fingerprinted, coalesced across concurrent
//! duplicates, and rendered by a pool of OS-thread-pinned workers.

pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod handlers;
pub mod middleware;
pub mod params;
pub mod processor;
pub mod queue;
pub mod router;
pub mod signer;
pub mod source_cache;
pub mod store;
pub mod telemetry;
