//! In-memory store backend.
//!
//! Implements [`StoreAdapter`] over process-local maps. Used by tests and
//! as a reference implementation of the adapter contract: deterministic
//! key-ordered pagination, equality-query filtering, write-path expiry, and
//! per-table failure injection for exercising fetch-failure boundaries.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use keel_core::{record_key, Query, Record, StoreError, StoreResult};

use crate::adapter::{Page, PutOptions, PutOutcome, StoreAdapter, PUT_BATCH_LIMIT};

/// Attribute carrying the expiry instant, unix seconds.
const EXPIRES_ATTRIBUTE: &str = "__expires";

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, BTreeMap<String, Record>>,
    failing: HashSet<String>,
    fetch_calls: HashMap<String, usize>,
}

/// Process-local store backend.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with records, assigning keys to records without one.
    pub fn seed<I>(&self, table: &str, records: I)
    where
        I: IntoIterator<Item = Record>,
    {
        let mut state = self.state.write().unwrap();
        let slot = state.tables.entry(table.to_string()).or_default();
        for mut record in records {
            let key = record_key(&record)
                .map(str::to_string)
                .unwrap_or_else(new_key);
            record.insert("key".to_string(), json!(key.clone()));
            slot.insert(key, record);
        }
    }

    /// Make every subsequent read of `table` fail.
    pub fn fail_table(&self, table: &str) {
        self.state
            .write()
            .unwrap()
            .failing
            .insert(table.to_string());
    }

    /// Let reads of `table` succeed again.
    pub fn restore_table(&self, table: &str) {
        self.state.write().unwrap().failing.remove(table);
    }

    /// Number of records stored in `table`.
    pub fn record_count(&self, table: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .tables
            .get(table)
            .map_or(0, BTreeMap::len)
    }

    /// Number of `fetch_page` calls issued against `table`.
    pub fn fetch_calls(&self, table: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .fetch_calls
            .get(table)
            .copied()
            .unwrap_or(0)
    }

    fn check_readable(state: &MemoryState, table: &str) -> StoreResult<()> {
        if state.failing.contains(table) {
            return Err(StoreError::Fetch {
                table: table.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn is_live(record: &Record) -> bool {
        match record.get(EXPIRES_ATTRIBUTE).and_then(|v| v.as_i64()) {
            Some(expires) => expires > Utc::now().timestamp(),
            None => true,
        }
    }

    fn stamp_expiry(record: &mut Record, options: &PutOptions) {
        let expires = options
            .expire_at
            .map(|at| at.timestamp())
            .or_else(|| {
                options
                    .expire_in
                    .map(|d| Utc::now().timestamp() + d.as_secs() as i64)
            });
        if let Some(expires) = expires {
            record.insert(EXPIRES_ATTRIBUTE.to_string(), json!(expires));
        }
    }

    fn write_record(
        state: &mut MemoryState,
        table: &str,
        mut record: Record,
        key: Option<String>,
        options: &PutOptions,
        reject_existing: bool,
    ) -> StoreResult<Record> {
        let key = key
            .or_else(|| record_key(&record).map(str::to_string))
            .unwrap_or_else(new_key);
        let slot = state.tables.entry(table.to_string()).or_default();
        if reject_existing && slot.contains_key(&key) {
            return Err(StoreError::KeyExists {
                table: table.to_string(),
                key,
            });
        }
        record.insert("key".to_string(), json!(key.clone()));
        Self::stamp_expiry(&mut record, options);
        slot.insert(key, record.clone());
        Ok(record)
    }
}

fn new_key() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn fetch_page(
        &self,
        table: &str,
        query: Option<&Query>,
        limit: usize,
        last: Option<&str>,
    ) -> StoreResult<Page> {
        let mut state = self.state.write().unwrap();
        *state.fetch_calls.entry(table.to_string()).or_insert(0) += 1;
        Self::check_readable(&state, table)?;

        let matching: Vec<Record> = state
            .tables
            .get(table)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|record| Self::is_live(record))
            .filter(|record| query.map_or(true, |q| q.matches(record)))
            .cloned()
            .collect();

        let resume_at = match last {
            Some(cursor) => matching
                .iter()
                .position(|record| record_key(record) == Some(cursor))
                .map_or(matching.len(), |i| i + 1),
            None => 0,
        };
        let end = matching.len().min(resume_at + limit.max(1));
        let items = matching[resume_at..end].to_vec();
        let last = if end < matching.len() {
            items.last().and_then(record_key).map(str::to_string)
        } else {
            None
        };
        Ok(Page { items, last })
    }

    async fn get(&self, table: &str, key: &str) -> StoreResult<Option<Record>> {
        let state = self.state.read().unwrap();
        Self::check_readable(&state, table)?;
        Ok(state
            .tables
            .get(table)
            .and_then(|slot| slot.get(key))
            .filter(|record| Self::is_live(record))
            .cloned())
    }

    async fn insert(
        &self,
        table: &str,
        record: Record,
        key: Option<String>,
        options: PutOptions,
    ) -> StoreResult<Record> {
        let mut state = self.state.write().unwrap();
        Self::write_record(&mut state, table, record, key, &options, true)
    }

    async fn put(
        &self,
        table: &str,
        record: Record,
        key: Option<String>,
        options: PutOptions,
    ) -> StoreResult<Record> {
        let mut state = self.state.write().unwrap();
        Self::write_record(&mut state, table, record, key, &options, false)
    }

    async fn put_many(
        &self,
        table: &str,
        records: Vec<Record>,
        options: PutOptions,
    ) -> StoreResult<PutOutcome> {
        if records.len() > PUT_BATCH_LIMIT {
            return Err(StoreError::Write {
                table: table.to_string(),
                reason: format!("batch of {} exceeds limit {}", records.len(), PUT_BATCH_LIMIT),
            });
        }
        let mut state = self.state.write().unwrap();
        let mut outcome = PutOutcome::default();
        for record in records {
            let stored = Self::write_record(&mut state, table, record, None, &options, false)?;
            outcome.processed.push(stored);
        }
        Ok(outcome)
    }

    async fn delete(&self, table: &str, key: &str) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        if let Some(slot) = state.tables.get_mut(table) {
            slot.remove(key);
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
