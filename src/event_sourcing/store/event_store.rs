use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::event_sourcing::core::{
    DomainEvent, EventEnvelope, EventFactory, EventStoreError, Result, StorageRecord,
    UncommittedEvent,
};
use crate::metrics::EventStoreMetrics;

use super::table::{EventTable, Expectation, PutOutcome, RangeQuery};

// ============================================================================
// Generic Event Store - Writer and Reader for Event Streams
// ============================================================================
//
// Works with ANY event payload type and ANY backing table.
//
// Type Parameters:
// - `E`: The domain event payload (must implement DomainEvent)
// - `T`: The backing table (must implement EventTable)
//
// Responsibilities:
// 1. Single commit guarded by the predecessor record (optimistic concurrency)
// 2. Unconditional batch commit for bulk loads
// 3. Load an event stream from a version onward, draining every page
//
// The store keeps no mutable state; concurrent writers are arbitrated by the
// table's conditional put alone. Nothing is retried here.
//
// ============================================================================

/// Reads start at version 1 unless told otherwise
pub const DEFAULT_FROM_VERSION: i64 = 1;

/// Options for `EventStore::read_events`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Lowest version returned; `None` means `DEFAULT_FROM_VERSION`
    pub from_version: Option<i64>,
    /// Strongly consistent read instead of eventually consistent
    pub consistent_read: bool,
}

impl ReadOptions {
    pub fn from_version(version: i64) -> Self {
        Self {
            from_version: Some(version),
            ..Self::default()
        }
    }

    pub fn consistent(mut self) -> Self {
        self.consistent_read = true;
        self
    }
}

pub struct EventStore<E, T: EventTable> {
    table: Arc<T>,
    factory: Arc<dyn EventFactory<E>>,
    metrics: Option<Arc<EventStoreMetrics>>,
}

impl<E, T> EventStore<E, T>
where
    E: DomainEvent,
    T: EventTable,
{
    pub fn new(table: Arc<T>, factory: Arc<dyn EventFactory<E>>) -> Self {
        Self {
            table,
            factory,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<EventStoreMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Append one event, guarded by the record at `aggregate_version - 1`
    ///
    /// Version 0 only succeeds on an empty key. Any later version first reads
    /// its predecessor and then writes on condition that the target key is
    /// still empty and the predecessor is unchanged. A missing predecessor or
    /// a rejected condition is a `ConcurrencyConflict`.
    pub async fn commit(
        &self,
        event: &UncommittedEvent<E>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        validate_key(&event.aggregate_id, event.aggregate_version)?;

        let started = Instant::now();
        let result = self.conditional_commit(event, cancel).await;

        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(()) => "applied",
                Err(e) if e.is_concurrency_conflict() => "conflict",
                Err(_) => "error",
            };
            metrics.record_commit(outcome, started.elapsed().as_secs_f64());
        }

        result
    }

    async fn conditional_commit(
        &self,
        event: &UncommittedEvent<E>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let record = StorageRecord::encode(event)?;
        let version = record.aggregate_version;

        let expectation = if version == 0 {
            Expectation::Absent
        } else {
            let previous =
                cancellable(cancel, self.table.get(&record.aggregate_id, version - 1)).await?;
            match previous {
                Some(previous) => Expectation::Previous(previous),
                None => {
                    tracing::warn!(
                        aggregate_id = %record.aggregate_id,
                        version = version,
                        "Predecessor event missing, rejecting commit"
                    );
                    return Err(conflict(&record));
                }
            }
        };

        match cancellable(cancel, self.table.put(&record, &expectation)).await? {
            PutOutcome::Applied => {
                tracing::info!(
                    aggregate_id = %record.aggregate_id,
                    version = version,
                    event_name = %record.event_name,
                    "Committed event"
                );
                Ok(())
            }
            PutOutcome::Rejected => {
                tracing::warn!(
                    aggregate_id = %record.aggregate_id,
                    version = version,
                    "Conditional write rejected"
                );
                Err(conflict(&record))
            }
        }
    }

    /// Write many events in one unconditional batch request
    ///
    /// No predecessor check is made. Meant for bulk loads where the caller
    /// already guarantees version uniqueness; use `commit` per event when
    /// concurrent writers are possible. A failed batch may be partially
    /// applied.
    pub async fn commit_batch(
        &self,
        events: &[UncommittedEvent<E>],
        cancel: &CancellationToken,
    ) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        for event in events {
            validate_key(&event.aggregate_id, event.aggregate_version)?;
        }

        let started = Instant::now();
        let result = self.unconditional_batch(events, cancel).await;

        if let Some(metrics) = &self.metrics {
            metrics.record_batch(events.len(), started.elapsed().as_secs_f64(), result.is_ok());
        }

        result
    }

    async fn unconditional_batch(
        &self,
        events: &[UncommittedEvent<E>],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let records = events
            .iter()
            .map(StorageRecord::encode)
            .collect::<Result<Vec<_>>>()?;

        cancellable(cancel, self.table.put_batch(&records)).await?;

        tracing::info!(event_count = records.len(), "Committed event batch");
        Ok(())
    }

    /// Load an aggregate's events from `options.from_version` onward
    ///
    /// All pages are drained before anything is returned. Events come back in
    /// ascending version order; an unknown aggregate yields an empty vec.
    /// Range queries go through whatever index the table was configured with.
    pub async fn read_events(
        &self,
        aggregate_id: &str,
        options: ReadOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<EventEnvelope<E>>> {
        if aggregate_id.is_empty() {
            return Err(EventStoreError::InvalidArgument(
                "aggregate id must not be empty".to_string(),
            ));
        }

        let started = Instant::now();
        let query = RangeQuery {
            aggregate_id: aggregate_id.to_string(),
            from_version: options.from_version.unwrap_or(DEFAULT_FROM_VERSION),
            consistent_read: options.consistent_read,
        };

        let result = self.drain_and_reconstitute(&query, cancel).await;

        if let Some(metrics) = &self.metrics {
            let event_count = result.as_ref().map_or(0, Vec::len);
            metrics.record_read(event_count, started.elapsed().as_secs_f64(), result.is_ok());
        }

        result
    }

    async fn drain_and_reconstitute(
        &self,
        query: &RangeQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<EventEnvelope<E>>> {
        let mut records = Vec::new();
        let mut cursor = None;
        let mut pages = 0usize;

        loop {
            let page = cancellable(cancel, self.table.query_page(query, cursor)).await?;
            pages += 1;
            if let Some(metrics) = &self.metrics {
                metrics.record_page();
            }

            tracing::debug!(
                aggregate_id = %query.aggregate_id,
                page = pages,
                records = page.records.len(),
                "Fetched event page"
            );

            records.extend(page.records);
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let events = records
            .into_iter()
            .map(|record| record.reconstitute(self.factory.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            aggregate_id = %query.aggregate_id,
            from_version = query.from_version,
            pages = pages,
            event_count = events.len(),
            "Loaded events"
        );

        Ok(events)
    }
}

fn validate_key(aggregate_id: &str, aggregate_version: i64) -> Result<()> {
    if aggregate_id.is_empty() {
        return Err(EventStoreError::InvalidArgument(
            "aggregate id must not be empty".to_string(),
        ));
    }
    if aggregate_version < 0 {
        return Err(EventStoreError::InvalidArgument(format!(
            "aggregate version must not be negative, got {}",
            aggregate_version
        )));
    }
    Ok(())
}

fn conflict(record: &StorageRecord) -> EventStoreError {
    EventStoreError::ConcurrencyConflict {
        aggregate_id: record.aggregate_id.clone(),
        version: record.aggregate_version,
    }
}

/// Race a backing-store call against the cancellation token
async fn cancellable<F, R>(cancel: &CancellationToken, call: F) -> Result<R>
where
    F: Future<Output = Result<R>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EventStoreError::Cancelled),
        result = call => result,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
