//! Async store adapter trait.
//!
//! The wire-level surface of the remote key-value document store, consumed
//! by the rest of keel through this narrow interface. Implementations own
//! connection handling, timeouts, and retry policy; callers see page-level
//! primitives only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use keel_core::{Query, Record, StoreResult};

/// Maximum records accepted by a single `put_many` call.
pub const PUT_BATCH_LIMIT: usize = 25;

/// One page of a bulk fetch.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Record>,
    /// Resume cursor; `None` when no pages remain.
    pub last: Option<String>,
}

/// Expiry options for write operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Expire the record this long after the write.
    pub expire_in: Option<Duration>,
    /// Expire the record at an absolute instant.
    pub expire_at: Option<DateTime<Utc>>,
}

impl PutOptions {
    /// Options with no expiry.
    pub fn none() -> Self {
        Self::default()
    }

    /// Expire this long after the write.
    pub fn expire_in(duration: Duration) -> Self {
        Self {
            expire_in: Some(duration),
            expire_at: None,
        }
    }

    /// Expire at an absolute instant.
    pub fn expire_at(at: DateTime<Utc>) -> Self {
        Self {
            expire_in: None,
            expire_at: Some(at),
        }
    }
}

/// Outcome of a batched put.
#[derive(Debug, Clone, Default)]
pub struct PutOutcome {
    pub processed: Vec<Record>,
    pub failed: Vec<Record>,
}

impl PutOutcome {
    /// Fold another outcome into this one.
    pub fn extend(&mut self, other: PutOutcome) {
        self.processed.extend(other.processed);
        self.failed.extend(other.failed);
    }
}

/// Store adapter: page-level primitives of the remote document store.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Fetch one page of at most `limit` records matching `query`,
    /// resuming from the `last` cursor of the previous page.
    async fn fetch_page(
        &self,
        table: &str,
        query: Option<&Query>,
        limit: usize,
        last: Option<&str>,
    ) -> StoreResult<Page>;

    /// Get a single record by key.
    async fn get(&self, table: &str, key: &str) -> StoreResult<Option<Record>>;

    /// Write a record, rejecting an already-present key. A missing key is
    /// assigned by the store; the stored record is returned with its key.
    async fn insert(
        &self,
        table: &str,
        record: Record,
        key: Option<String>,
        options: PutOptions,
    ) -> StoreResult<Record>;

    /// Write a record, overwriting whatever is stored under the same key.
    async fn put(
        &self,
        table: &str,
        record: Record,
        key: Option<String>,
        options: PutOptions,
    ) -> StoreResult<Record>;

    /// Write up to [`PUT_BATCH_LIMIT`] records in one call.
    async fn put_many(
        &self,
        table: &str,
        records: Vec<Record>,
        options: PutOptions,
    ) -> StoreResult<PutOutcome>;

    /// Delete a record by key. Deleting an absent key is not an error.
    async fn delete(&self, table: &str, key: &str) -> StoreResult<()>;
}
