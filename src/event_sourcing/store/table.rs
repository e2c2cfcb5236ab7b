use async_trait::async_trait;

use crate::event_sourcing::core::{Result, StorageRecord};

// ============================================================================
// Backing Store Contract
// ============================================================================
//
// The minimum a partitioned store must offer for the event store protocol:
// - point read by (aggregate_id, aggregate_version)
// - conditional single-item put
// - unconditional batch put
// - paged range query over one partition, ascending by version
//
// Connection handling, retries and throttling belong to the driver behind
// each implementation.
//
// ============================================================================

/// Precondition attached to a single-item put
#[derive(Clone, Debug, PartialEq)]
pub enum Expectation {
    /// Nothing may exist at the target key (first event of a stream)
    Absent,
    /// Nothing may exist at the target key and the stored predecessor must
    /// still equal this record
    Previous(StorageRecord),
}

/// Result of a conditional put that reached the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    Applied,
    Rejected,
}

/// Range query over one partition: `aggregate_version >= from_version`
///
/// Which index serves the query is the table's own configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeQuery {
    pub aggregate_id: String,
    pub from_version: i64,
    pub consistent_read: bool,
}

/// One page of a range query
#[derive(Debug)]
pub struct Page<C> {
    pub records: Vec<StorageRecord>,
    /// `None` once the query is exhausted
    pub next: Option<C>,
}

#[async_trait]
pub trait EventTable: Send + Sync {
    /// Opaque continuation handed back between pages
    type Cursor: Send;

    async fn get(
        &self,
        aggregate_id: &str,
        aggregate_version: i64,
    ) -> Result<Option<StorageRecord>>;

    async fn put(&self, record: &StorageRecord, expectation: &Expectation) -> Result<PutOutcome>;

    async fn put_batch(&self, records: &[StorageRecord]) -> Result<()>;

    async fn query_page(
        &self,
        query: &RangeQuery,
        cursor: Option<Self::Cursor>,
    ) -> Result<Page<Self::Cursor>>;
}
