use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::event_sourcing::core::{Result, StorageRecord};

use super::table::{EventTable, Expectation, Page, PutOutcome, RangeQuery};

// ============================================================================
// In-Memory Event Table
// ============================================================================
//
// Same contract as the ScyllaDB table, held in a BTreeMap keyed by
// (aggregate_id, aggregate_version). A single mutex makes every conditional
// put atomic. Range queries are cut into pages of `page_size` records so
// callers exercise the same draining path as against a real cluster.
//
// ============================================================================

const DEFAULT_PAGE_SIZE: usize = 100;

type Key = (String, i64);

pub struct InMemoryEventTable {
    records: Mutex<BTreeMap<Key, StorageRecord>>,
    page_size: usize,
    calls: AtomicUsize,
}

impl InMemoryEventTable {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Page size is clamped to at least one record
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of backing-store requests served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of records stored for one aggregate
    pub async fn stream_len(&self, aggregate_id: &str) -> usize {
        let records = self.records.lock().await;
        records.range(stream_range(aggregate_id, 0)).count()
    }

    fn track_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for InMemoryEventTable {
    fn default() -> Self {
        Self::new()
    }
}

fn key_of(record: &StorageRecord) -> Key {
    (record.aggregate_id.clone(), record.aggregate_version)
}

fn stream_range(aggregate_id: &str, from_version: i64) -> std::ops::RangeInclusive<Key> {
    (aggregate_id.to_string(), from_version)..=(aggregate_id.to_string(), i64::MAX)
}

#[async_trait]
impl EventTable for InMemoryEventTable {
    /// Next version to resume from
    type Cursor = i64;

    async fn get(
        &self,
        aggregate_id: &str,
        aggregate_version: i64,
    ) -> Result<Option<StorageRecord>> {
        self.track_call();
        let records = self.records.lock().await;
        Ok(records
            .get(&(aggregate_id.to_string(), aggregate_version))
            .cloned())
    }

    async fn put(&self, record: &StorageRecord, expectation: &Expectation) -> Result<PutOutcome> {
        self.track_call();
        let mut records = self.records.lock().await;

        if records.contains_key(&key_of(record)) {
            return Ok(PutOutcome::Rejected);
        }

        if let Expectation::Previous(expected) = expectation {
            match records.get(&key_of(expected)) {
                Some(current) if current == expected => {}
                _ => return Ok(PutOutcome::Rejected),
            }
        }

        records.insert(key_of(record), record.clone());
        Ok(PutOutcome::Applied)
    }

    async fn put_batch(&self, batch: &[StorageRecord]) -> Result<()> {
        self.track_call();
        let mut records = self.records.lock().await;
        for record in batch {
            records.insert(key_of(record), record.clone());
        }
        Ok(())
    }

    async fn query_page(&self, query: &RangeQuery, cursor: Option<i64>) -> Result<Page<i64>> {
        self.track_call();
        let from = cursor.unwrap_or(query.from_version);
        let records = self.records.lock().await;

        // One extra record tells us whether another page follows
        let mut page: Vec<StorageRecord> = records
            .range(stream_range(&query.aggregate_id, from))
            .take(self.page_size + 1)
            .map(|(_, record)| record.clone())
            .collect();

        let next = if page.len() > self.page_size {
            page.pop().map(|record| record.aggregate_version)
        } else {
            None
        };

        Ok(Page { records: page, next })
    }
}
