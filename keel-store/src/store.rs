//! Pagination-transparent store wrapper.
//!
//! [`Store`] wraps an adapter and owns the orchestration the adapter keeps
//! out of scope: exhaustive pagination of bulk fetches, chunking of large
//! batch writes, and the existence probe consumed by the duplicate check.

use std::sync::Arc;

use keel_core::{record_key, Query, Record, StoreError, StoreResult};

use crate::adapter::{PutOptions, PutOutcome, StoreAdapter, PUT_BATCH_LIMIT};
use crate::config::StoreConfig;

/// Result of an existence probe.
#[derive(Debug, Clone)]
pub enum ExistOutcome {
    /// No stored record matches.
    None,
    /// Exactly one stored record matches.
    One(Record),
    /// More than one stored record matches; the caller must not pick one.
    Many(Vec<Record>),
}

/// Store front-end used by everything above the adapter.
#[derive(Clone)]
pub struct Store {
    adapter: Arc<dyn StoreAdapter>,
    config: StoreConfig,
}

impl Store {
    /// Wrap an adapter with default configuration.
    pub fn new(adapter: Arc<dyn StoreAdapter>) -> Self {
        Self::with_config(adapter, StoreConfig::default())
    }

    /// Wrap an adapter with explicit configuration.
    pub fn with_config(adapter: Arc<dyn StoreAdapter>, config: StoreConfig) -> Self {
        Self { adapter, config }
    }

    /// The wrapped adapter.
    pub fn adapter(&self) -> &Arc<dyn StoreAdapter> {
        &self.adapter
    }

    /// The active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Fetch every record matching `query`, reading pages until the store
    /// signals no more remain. Callers never see partial pages.
    pub async fn fetch_all(&self, table: &str, query: Option<&Query>) -> StoreResult<Vec<Record>> {
        let limit = self.config.page_size;
        let mut page = self.adapter.fetch_page(table, query, limit, None).await?;
        let mut records = page.items;
        while let Some(last) = page.last {
            page = self
                .adapter
                .fetch_page(table, query, limit, Some(&last))
                .await?;
            records.extend(page.items);
        }
        Ok(records)
    }

    /// Fetch a single record by key.
    pub async fn fetch_one(&self, table: &str, key: &str) -> StoreResult<Option<Record>> {
        self.adapter.get(table, key).await
    }

    /// Probe for records matching `query` and classify the match count.
    pub async fn exist(&self, table: &str, query: &Query) -> StoreResult<ExistOutcome> {
        let mut matches = self.fetch_all(table, Some(query)).await?;
        Ok(match matches.len() {
            0 => ExistOutcome::None,
            1 => ExistOutcome::One(matches.remove(0)),
            _ => ExistOutcome::Many(matches),
        })
    }

    /// Create a new key in `table` by inserting an empty record, returning
    /// the key the store assigned.
    pub async fn create_key(&self, table: &str, key: Option<String>) -> StoreResult<Option<String>> {
        let record = self
            .adapter
            .insert(table, Record::new(), key, PutOptions::none())
            .await?;
        Ok(record_key(&record).map(str::to_string))
    }

    /// Store a record under the key carried in its `key` attribute,
    /// replacing any stored record with that key.
    pub async fn save(&self, table: &str, mut record: Record) -> StoreResult<Record> {
        let key = record
            .remove("key")
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|k| !k.is_empty());
        self.adapter.put(table, record, key, PutOptions::none()).await
    }

    /// Insert a record, rejecting an already-present key.
    pub async fn insert(
        &self,
        table: &str,
        record: Record,
        key: Option<String>,
        options: PutOptions,
    ) -> StoreResult<Record> {
        self.adapter.insert(table, record, key, options).await
    }

    /// Write a record, overwriting any record under the same key.
    pub async fn put(
        &self,
        table: &str,
        record: Record,
        key: Option<String>,
        options: PutOptions,
    ) -> StoreResult<Record> {
        self.adapter.put(table, record, key, options).await
    }

    /// Write any number of records, chunked into batches the adapter
    /// accepts, aggregating processed and failed items.
    pub async fn put_all(
        &self,
        table: &str,
        records: Vec<Record>,
        options: PutOptions,
    ) -> StoreResult<PutOutcome> {
        let mut outcome = PutOutcome::default();
        for chunk in records.chunks(PUT_BATCH_LIMIT) {
            let batch = self
                .adapter
                .put_many(table, chunk.to_vec(), options.clone())
                .await?;
            outcome.extend(batch);
        }
        if !outcome.failed.is_empty() {
            tracing::warn!(
                table = table,
                failed = outcome.failed.len(),
                "batched put left unprocessed records"
            );
        }
        Ok(outcome)
    }

    /// Merge `updates` into the record stored under `key` and write it back.
    pub async fn update(&self, table: &str, key: &str, updates: Record) -> StoreResult<Record> {
        let mut record = self
            .fetch_one(table, key)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                key: key.to_string(),
            })?;
        for (field, value) in updates {
            record.insert(field, value);
        }
        self.adapter
            .put(table, record, Some(key.to_string()), PutOptions::none())
            .await
    }

    /// Delete a record by key.
    pub async fn delete(&self, table: &str, key: &str) -> StoreResult<()> {
        self.adapter.delete(table, key).await
    }
}
