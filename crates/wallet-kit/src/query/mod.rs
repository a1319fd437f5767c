//! Query coordination.
//!
//! [`QueryClient`] caches asynchronous reads by structured key, dedupes
//! concurrent fetches, and tracks staleness. Hooks register
//! `(key, fetcher, options)` with it and read back a [`QueryResult`].
//!
//! - [`QueryKey`] — Structured cache key with a canonical hash
//! - [`QueryOptions`] — Per-query behaviour: freshness, retries, callbacks
//! - [`QueryResult`] — Snapshot of an entry as seen by one caller

mod client;
mod options;
mod result;

pub use client::{QueryClient, QueryKey, canonical_hash};
pub use options::{
    DEFAULT_CACHE_TIME, ErrorCallback, MAX_RETRY, MAX_RETRY_DELAY, QueryOptions, SettledCallback,
    SuccessCallback,
};
pub use result::{FetchStatus, QueryResult, QueryStatus};
