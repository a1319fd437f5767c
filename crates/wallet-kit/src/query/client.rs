//! Keyed query cache with in-flight deduplication.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::Error;

use super::options::{DEFAULT_CACHE_TIME, QueryOptions, backoff};
use super::result::{FetchStatus, QueryResult, QueryStatus};

type InFlight<T> = Shared<BoxFuture<'static, Result<T, Arc<Error>>>>;
type Entries = HashMap<String, CacheEntry>;

// ============================================================================
// Keys
// ============================================================================

/// A structured cache key.
///
/// Keys are compared through [`hash_key`](QueryKey::hash_key), which by
/// default is the canonical JSON of the key: object members sorted by name
/// at every depth, no whitespace. Two keys with the same field values hash
/// the same no matter how their maps were built.
pub trait QueryKey: Serialize {
    /// Entity tag, used for bulk invalidation and removal.
    fn entity(&self) -> &str;

    /// Stable hash identifying the cache entry.
    fn hash_key(&self) -> Result<String, Error> {
        canonical_hash(self)
    }
}

/// Canonical JSON of any serializable value.
///
/// # Example
///
/// ```
/// use wallet_kit::canonical_hash;
///
/// let a = serde_json::json!({ "b": 1, "a": [true, { "y": 2, "x": 1 }] });
/// assert_eq!(canonical_hash(&a).unwrap(), r#"{"a":[true,{"x":1,"y":2}],"b":1}"#);
/// ```
pub fn canonical_hash<K: Serialize + ?Sized>(key: &K) -> Result<String, Error> {
    let value = serde_json::to_value(key)?;
    let mut out = String::new();
    write_canonical(&value, &mut out);
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut members: Vec<_> = map.iter().collect();
            members.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, member)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(member, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

// ============================================================================
// Cache entries
// ============================================================================

struct EntryMeta {
    entity: String,
    cache_time: Duration,
    last_used: Instant,
    /// Id of the running fetch, if any.
    fetch_id: Option<u64>,
    invalidated: bool,
}

struct QueryState<T> {
    data: Option<T>,
    error: Option<Arc<Error>>,
    status: QueryStatus,
    data_updated_at: Option<Instant>,
    failure_count: u32,
    in_flight: Option<InFlight<T>>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
            data_updated_at: None,
            failure_count: 0,
            in_flight: None,
        }
    }
}

struct CacheEntry {
    meta: EntryMeta,
    state: Box<dyn Any + Send>,
}

impl CacheEntry {
    fn new<T: Send + Sync + 'static>(entity: &str, now: Instant) -> Self {
        Self {
            meta: EntryMeta {
                entity: entity.to_string(),
                cache_time: DEFAULT_CACHE_TIME,
                last_used: now,
                fetch_id: None,
                invalidated: false,
            },
            state: Box::new(QueryState::<T>::default()),
        }
    }

    fn snapshot<T: Clone + 'static>(
        &self,
        stale_time: Duration,
        now: Instant,
    ) -> Option<QueryResult<T>> {
        let state = self.state.downcast_ref::<QueryState<T>>()?;
        Some(snapshot(&self.meta, state, stale_time, now))
    }
}

fn is_stale<T>(
    meta: &EntryMeta,
    state: &QueryState<T>,
    stale_time: Duration,
    now: Instant,
) -> bool {
    meta.invalidated
        || state
            .data_updated_at
            .is_none_or(|at| now.duration_since(at) >= stale_time)
}

fn snapshot<T: Clone>(
    meta: &EntryMeta,
    state: &QueryState<T>,
    stale_time: Duration,
    now: Instant,
) -> QueryResult<T> {
    QueryResult {
        data: state.data.clone(),
        error: state.error.clone(),
        status: state.status,
        fetch_status: if state.in_flight.is_some() {
            FetchStatus::Fetching
        } else {
            FetchStatus::Idle
        },
        data_updated_at: state.data_updated_at,
        failure_count: state.failure_count,
        is_stale: is_stale(meta, state, stale_time, now),
    }
}

/// Result for a caller whose entry disappeared while it waited.
fn detached<T: Clone>(result: &Result<T, Arc<Error>>) -> QueryResult<T> {
    match result {
        Ok(data) => QueryResult {
            data: Some(data.clone()),
            status: QueryStatus::Success,
            data_updated_at: Some(Instant::now()),
            ..Default::default()
        },
        Err(error) => QueryResult {
            error: Some(error.clone()),
            status: QueryStatus::Error,
            ..Default::default()
        },
    }
}

/// Get the entry for `hash` typed as `T`, creating or replacing it as needed.
fn slot<'a, T: Send + Sync + 'static>(
    entries: &'a mut Entries,
    hash: &str,
    entity: &str,
    now: Instant,
) -> Option<(&'a mut EntryMeta, &'a mut QueryState<T>)> {
    let entry = entries
        .entry(hash.to_string())
        .or_insert_with(|| CacheEntry::new::<T>(entity, now));
    if !entry.state.is::<QueryState<T>>() {
        warn!(key = hash, "cached value has a different type, replacing entry");
        *entry = CacheEntry::new::<T>(entity, now);
    }
    let CacheEntry { meta, state } = entry;
    let state = state.downcast_mut::<QueryState<T>>()?;
    Some((meta, state))
}

fn collect_expired(entries: &mut Entries, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|hash, entry| {
        let keep = entry.meta.fetch_id.is_some()
            || now.duration_since(entry.meta.last_used) < entry.meta.cache_time;
        if !keep {
            trace!(key = %hash, "evicting idle query");
        }
        keep
    });
    before - entries.len()
}

// ============================================================================
// QueryClient
// ============================================================================

#[derive(Default)]
struct Inner {
    entries: Mutex<Entries>,
    next_fetch_id: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_failure<T: Send + Sync + 'static>(&self, hash: &str, fetch_id: u64, failures: u32) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(hash) {
            if entry.meta.fetch_id == Some(fetch_id) {
                if let Some(state) = entry.state.downcast_mut::<QueryState<T>>() {
                    state.failure_count = failures;
                }
            }
        }
    }

    fn settle<T: Clone + Send + Sync + 'static>(
        &self,
        hash: &str,
        fetch_id: u64,
        result: &Result<T, Arc<Error>>,
        failures: u32,
    ) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(hash) else {
            debug!(key = hash, fetch_id, "query removed before its fetch settled");
            return;
        };
        if entry.meta.fetch_id != Some(fetch_id) {
            return;
        }
        let Some(state) = entry.state.downcast_mut::<QueryState<T>>() else {
            return;
        };

        let now = Instant::now();
        entry.meta.fetch_id = None;
        entry.meta.last_used = now;
        state.in_flight = None;

        match result {
            Ok(data) => {
                state.data = Some(data.clone());
                state.error = None;
                state.status = QueryStatus::Success;
                state.data_updated_at = Some(now);
                state.failure_count = 0;
                entry.meta.invalidated = false;
            }
            Err(error) => {
                state.error = Some(error.clone());
                state.status = QueryStatus::Error;
                state.failure_count = failures;
            }
        }
        debug!(key = hash, fetch_id, ok = result.is_ok(), "fetch settled");
    }
}

/// Cache and coordinator for asynchronous reads.
///
/// Entries are keyed by [`QueryKey::hash_key`]. For every key there is at
/// most one running fetch: callers that arrive while it runs join it
/// instead of starting their own. A fetch keeps running on the tokio
/// runtime even if every caller stops waiting for it.
///
/// Idle entries are evicted lazily, on the next `fetch` or
/// [`collect_garbage`](Self::collect_garbage), once unused for longer than
/// their `cache_time`.
///
/// Cheap to clone; clones share the same cache.
///
/// # Example
///
/// ```rust,no_run
/// use wallet_kit::{QueryClient, QueryKey, QueryOptions};
///
/// #[derive(serde::Serialize)]
/// struct BlockKey {
///     entity: &'static str,
///     chain_id: u64,
/// }
///
/// impl QueryKey for BlockKey {
///     fn entity(&self) -> &str {
///         self.entity
///     }
/// }
///
/// # async fn example() -> Result<(), wallet_kit::Error> {
/// let queries = QueryClient::new();
/// let key = BlockKey { entity: "blockNumber", chain_id: 1 };
/// let result = queries
///     .fetch(
///         &key,
///         || async { Ok::<_, wallet_kit::Error>(19_000_000u64) },
///         QueryOptions::default().suspense(true),
///     )
///     .await?;
/// assert_eq!(result.data, Some(19_000_000));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch through the cache.
    ///
    /// - Disabled: returns the cached snapshot and never calls `fetcher`.
    /// - Fresh data (younger than `stale_time`, not invalidated): served
    ///   from the cache.
    /// - A fetch for the key is running: joins it.
    /// - Otherwise: starts a fetch, retrying up to `retry` times.
    ///
    /// With `suspense` the call waits for the fetch to settle. Without it
    /// the current snapshot is returned right away (`Loading`, or the old
    /// data with [`FetchStatus::Fetching`]).
    ///
    /// Callbacks in `options` run once when the fetch this call started or
    /// joined settles. Fetch failures are reported through
    /// [`QueryResult::error`]; `Err` is only returned for invalid options
    /// or a key that fails to serialize.
    pub async fn fetch<K, T, F, Fut>(
        &self,
        key: &K,
        fetcher: F,
        options: QueryOptions<T>,
    ) -> Result<QueryResult<T>, Error>
    where
        K: QueryKey + ?Sized,
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        self.run(key, fetcher, options, false).await
    }

    /// Like [`fetch`](Self::fetch), but ignores freshness.
    ///
    /// A fetch already running for the key is still joined.
    pub async fn refetch<K, T, F, Fut>(
        &self,
        key: &K,
        fetcher: F,
        options: QueryOptions<T>,
    ) -> Result<QueryResult<T>, Error>
    where
        K: QueryKey + ?Sized,
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        self.run(key, fetcher, options, true).await
    }

    async fn run<K, T, F, Fut>(
        &self,
        key: &K,
        fetcher: F,
        options: QueryOptions<T>,
        force: bool,
    ) -> Result<QueryResult<T>, Error>
    where
        K: QueryKey + ?Sized,
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        options.validate()?;
        let hash = key.hash_key()?;
        let now = Instant::now();

        let (current, observed) = {
            let mut entries = self.inner.lock();
            collect_expired(&mut entries, now);

            let Some((meta, state)) = slot::<T>(&mut entries, &hash, key.entity(), now) else {
                return Ok(QueryResult::default());
            };
            meta.last_used = now;
            meta.cache_time = options.cache_time;

            if !options.enabled {
                trace!(key = %hash, "query disabled");
                return Ok(snapshot(meta, state, options.stale_time, now));
            }

            let observed = if let Some(in_flight) = &state.in_flight {
                trace!(key = %hash, "joining in-flight fetch");
                in_flight.clone()
            } else if !force
                && state.data.is_some()
                && !is_stale(meta, state, options.stale_time, now)
            {
                trace!(key = %hash, "cache hit");
                return Ok(snapshot(meta, state, options.stale_time, now));
            } else {
                let fetch_id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                debug!(key = %hash, fetch_id, force, "starting fetch");

                let future = self.start_fetch(hash.clone(), fetch_id, fetcher, &options);
                meta.fetch_id = Some(fetch_id);
                state.in_flight = Some(future.clone());
                if state.data.is_none() {
                    state.status = QueryStatus::Loading;
                }
                // Drive the fetch independently of any caller.
                tokio::spawn(future.clone());
                future
            };

            (snapshot(meta, state, options.stale_time, now), observed)
        };

        if !options.suspense {
            if options.has_callbacks() {
                tokio::spawn(async move {
                    let result = observed.await;
                    options.notify(&result);
                });
            }
            return Ok(current);
        }

        let result = observed.await;
        options.notify(&result);

        let entries = self.inner.lock();
        let settled = entries
            .get(&hash)
            .and_then(|entry| entry.snapshot::<T>(options.stale_time, Instant::now()))
            .unwrap_or_else(|| detached(&result));
        Ok(settled)
    }

    fn start_fetch<T, F, Fut>(
        &self,
        hash: String,
        fetch_id: u64,
        fetcher: F,
        options: &QueryOptions<T>,
    ) -> InFlight<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let inner = self.inner.clone();
        let (retry, retry_delay) = (options.retry, options.retry_delay);

        async move {
            let mut failures = 0u32;
            let result = loop {
                match fetcher().await {
                    Ok(data) => break Ok(data),
                    Err(error) => {
                        failures += 1;
                        if failures > retry {
                            break Err(Arc::new(error));
                        }
                        let delay = backoff(retry_delay, failures - 1);
                        debug!(key = %hash, failures, ?delay, error = %error, "fetch failed, retrying");
                        inner.record_failure::<T>(&hash, fetch_id, failures);
                        tokio::time::sleep(delay).await;
                    }
                }
            };
            inner.settle(&hash, fetch_id, &result, failures);
            result
        }
        .boxed()
        .shared()
    }

    /// Cached data for `key`, if any.
    pub fn get_query_data<K, T>(&self, key: &K) -> Option<T>
    where
        K: QueryKey + ?Sized,
        T: Clone + 'static,
    {
        let hash = key.hash_key().ok()?;
        let entries = self.inner.lock();
        let state = entries.get(&hash)?.state.downcast_ref::<QueryState<T>>()?;
        state.data.clone()
    }

    /// Write data for `key` as if a fetch had just succeeded.
    pub fn set_query_data<K, T>(&self, key: &K, data: T) -> Result<(), Error>
    where
        K: QueryKey + ?Sized,
        T: Send + Sync + 'static,
    {
        let hash = key.hash_key()?;
        let now = Instant::now();
        let mut entries = self.inner.lock();
        if let Some((meta, state)) = slot::<T>(&mut entries, &hash, key.entity(), now) {
            meta.last_used = now;
            meta.invalidated = false;
            state.data = Some(data);
            state.error = None;
            state.status = QueryStatus::Success;
            state.data_updated_at = Some(now);
        }
        Ok(())
    }

    /// Mark every entry of `entity` stale. Returns how many were marked.
    pub fn invalidate_queries(&self, entity: &str) -> usize {
        let mut entries = self.inner.lock();
        let mut count = 0;
        for entry in entries.values_mut().filter(|e| e.meta.entity == entity) {
            entry.meta.invalidated = true;
            count += 1;
        }
        debug!(entity, count, "invalidated queries");
        count
    }

    /// Drop every entry of `entity`. Returns how many were dropped.
    ///
    /// Running fetches finish but their results are discarded.
    pub fn remove_queries(&self, entity: &str) -> usize {
        let mut entries = self.inner.lock();
        let before = entries.len();
        entries.retain(|_, e| e.meta.entity != entity);
        before - entries.len()
    }

    /// Drop the entry for `key`.
    pub fn remove_query<K: QueryKey + ?Sized>(&self, key: &K) -> bool {
        match key.hash_key() {
            Ok(hash) => self.inner.lock().remove(&hash).is_some(),
            Err(_) => false,
        }
    }

    /// Evict idle entries unused for longer than their `cache_time`.
    pub fn collect_garbage(&self) -> usize {
        collect_expired(&mut self.inner.lock(), Instant::now())
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries with a fetch running.
    pub fn fetching_count(&self) -> usize {
        self.inner
            .lock()
            .values()
            .filter(|e| e.meta.fetch_id.is_some())
            .count()
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.len())
            .finish()
    }
}
