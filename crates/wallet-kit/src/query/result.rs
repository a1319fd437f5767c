//! Query result snapshots.

use std::sync::Arc;

use tokio::time::Instant;

use crate::error::Error;

/// Where a query is in its data lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched, e.g. disabled from the start.
    #[default]
    Idle,
    /// First fetch in progress, no data yet.
    Loading,
    /// Last fetch succeeded.
    Success,
    /// Last fetch failed. Older data, if any, is kept.
    Error,
}

/// Whether a fetch is running right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchStatus {
    #[default]
    Idle,
    Fetching,
}

/// Snapshot of a cache entry as seen by one caller.
#[derive(Clone, Debug)]
pub struct QueryResult<T> {
    /// Latest successful data.
    pub data: Option<T>,
    /// Error of the latest failed fetch.
    pub error: Option<Arc<Error>>,
    pub status: QueryStatus,
    pub fetch_status: FetchStatus,
    /// When `data` was last written.
    pub data_updated_at: Option<Instant>,
    /// Consecutive failures of the latest fetch.
    pub failure_count: u32,
    /// Whether `data` is older than the caller's stale time, or was invalidated.
    pub is_stale: bool,
}

impl<T> Default for QueryResult<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
            fetch_status: FetchStatus::Idle,
            data_updated_at: None,
            failure_count: 0,
            is_stale: true,
        }
    }
}

impl<T> QueryResult<T> {
    pub fn is_idle(&self) -> bool {
        self.status == QueryStatus::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch_status == FetchStatus::Fetching
    }

    /// Whether any fetch has settled for this entry.
    pub fn is_fetched(&self) -> bool {
        self.data_updated_at.is_some() || self.error.is_some()
    }
}
