use std::ops::ControlFlow;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::client::session::Session;
use scylla::response::query_result::QueryResult;
use scylla::response::PagingState;
use scylla::statement::batch::Batch;
use scylla::statement::unprepared::Statement;
use scylla::statement::Consistency;
use scylla::value::{CqlValue, Row};

use crate::config::{ConfigError, EventStoreConfig};
use crate::event_sourcing::core::{EventStoreError, Result, StorageRecord};

use super::table::{EventTable, Expectation, Page, PutOutcome, RangeQuery};

// ============================================================================
// ScyllaDB Event Table
// ============================================================================
//
// Table layout:
//   PRIMARY KEY ((aggregate_id), aggregate_version)
//   CLUSTERING ORDER BY (aggregate_version ASC)
//
// Conditional puts use lightweight transactions. Both the target row and its
// predecessor live in the same partition, so the "target is free AND the
// predecessor is unchanged" check runs as one conditional batch.
//
// ============================================================================

type RecordRow = (String, i64, String, String, DateTime<Utc>);

/// CQL text for one keyspace/table pair
#[derive(Clone, Debug)]
pub struct CqlStatements {
    keyspace: String,
    table: String,
    replication_factor: u32,
    index_name: Option<String>,
}

impl CqlStatements {
    pub fn new(config: &EventStoreConfig) -> Self {
        Self {
            keyspace: config.keyspace.clone(),
            table: config.table.clone(),
            replication_factor: config.replication_factor,
            index_name: config.index_name.clone(),
        }
    }

    fn qualified(&self, name: &str) -> String {
        format!("{}.{}", self.keyspace, name)
    }

    pub fn schema(&self) -> Vec<String> {
        let mut statements = vec![
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                 {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
                self.keyspace, self.replication_factor
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    aggregate_id text,
                    aggregate_version bigint,
                    event_name text,
                    event_data text,
                    committed_at timestamp,
                    PRIMARY KEY ((aggregate_id), aggregate_version)
                ) WITH CLUSTERING ORDER BY (aggregate_version ASC)",
                self.qualified(&self.table)
            ),
        ];

        if let Some(index) = &self.index_name {
            statements.push(format!(
                "CREATE MATERIALIZED VIEW IF NOT EXISTS {} AS
                    SELECT aggregate_id, aggregate_version, event_name, event_data, committed_at
                    FROM {}
                    WHERE aggregate_id IS NOT NULL AND aggregate_version IS NOT NULL
                    PRIMARY KEY ((aggregate_id), aggregate_version)
                    WITH CLUSTERING ORDER BY (aggregate_version ASC)",
                self.qualified(index),
                self.qualified(&self.table)
            ));
        }

        statements
    }

    pub fn insert(&self, conditional: bool) -> String {
        format!(
            "INSERT INTO {} \
             (aggregate_id, aggregate_version, event_name, event_data, committed_at) \
             VALUES (?, ?, ?, ?, ?){}",
            self.qualified(&self.table),
            if conditional { " IF NOT EXISTS" } else { "" }
        )
    }

    /// Condition on the predecessor row for the conditional batch
    ///
    /// CQL only attaches an IF clause to a write, so this rewrites
    /// `event_name` with the value it already holds. Column values never
    /// change, but the cell's write time moves forward and tables with CDC
    /// enabled log an update for the predecessor row. Readers only look at
    /// column values, which stay as first committed.
    pub fn predecessor_check(&self) -> String {
        format!(
            "UPDATE {} SET event_name = ? WHERE aggregate_id = ? AND aggregate_version = ? \
             IF event_name = ? AND event_data = ? AND committed_at = ?",
            self.qualified(&self.table)
        )
    }

    pub fn select_one(&self) -> String {
        format!(
            "SELECT aggregate_id, aggregate_version, event_name, event_data, committed_at \
             FROM {} WHERE aggregate_id = ? AND aggregate_version = ?",
            self.qualified(&self.table)
        )
    }

    /// Reads from the configured index view, else the base table
    pub fn select_range(&self) -> String {
        let source = self.index_name.as_deref().unwrap_or(&self.table);
        format!(
            "SELECT aggregate_id, aggregate_version, event_name, event_data, committed_at \
             FROM {} WHERE aggregate_id = ? AND aggregate_version >= ? \
             ORDER BY aggregate_version ASC",
            self.qualified(source)
        )
    }
}

pub struct ScyllaEventTable {
    session: Arc<Session>,
    cql: CqlStatements,
    page_size: i32,
}

impl ScyllaEventTable {
    /// Rejects configs that fail `EventStoreConfig::validate`, including a
    /// page size below one, which the driver would panic on
    pub fn new(
        session: Arc<Session>,
        config: &EventStoreConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            session,
            cql: CqlStatements::new(config),
            page_size: config.page_size,
        })
    }

    /// Create keyspace, table and (when configured) the index view
    pub async fn ensure_schema(&self) -> Result<()> {
        for cql in self.cql.schema() {
            self.session
                .query_unpaged(cql, ())
                .await
                .map_err(|e| EventStoreError::backend(e, "Failed to create event store schema"))?;
        }

        tracing::info!(
            keyspace = %self.cql.keyspace,
            table = %self.cql.table,
            index = ?self.cql.index_name,
            "Event store schema ready"
        );
        Ok(())
    }
}

fn record_values(record: &StorageRecord) -> RecordRow {
    (
        record.aggregate_id.clone(),
        record.aggregate_version,
        record.event_name.clone(),
        record.event_data.clone(),
        record.timestamp,
    )
}

fn record_from_row(row: RecordRow) -> StorageRecord {
    let (aggregate_id, aggregate_version, event_name, event_data, timestamp) = row;
    StorageRecord {
        aggregate_id,
        aggregate_version,
        event_name,
        event_data,
        timestamp,
    }
}

/// Read the `[applied]` column of an LWT response
fn was_applied(result: QueryResult) -> Result<bool> {
    let rows = result
        .into_rows_result()
        .map_err(|e| EventStoreError::backend(e, "Conditional write returned no rows"))?;

    let first = rows
        .maybe_first_row::<Row>()
        .map_err(|e| EventStoreError::backend(e, "Failed to decode conditional write result"))?;

    match first.and_then(|row| row.columns.into_iter().next().flatten()) {
        Some(CqlValue::Boolean(applied)) => Ok(applied),
        other => Err(EventStoreError::Backend(anyhow!(
            "Unexpected [applied] column in conditional write result: {:?}",
            other
        ))),
    }
}

fn read_consistency(consistent_read: bool) -> Consistency {
    if consistent_read {
        Consistency::Quorum
    } else {
        Consistency::One
    }
}

#[async_trait]
impl EventTable for ScyllaEventTable {
    type Cursor = PagingState;

    async fn get(
        &self,
        aggregate_id: &str,
        aggregate_version: i64,
    ) -> Result<Option<StorageRecord>> {
        let mut statement = Statement::new(self.cql.select_one());
        statement.set_consistency(Consistency::Quorum);

        let result = self
            .session
            .query_unpaged(statement, (aggregate_id, aggregate_version))
            .await
            .map_err(|e| EventStoreError::backend(e, "Failed to read event"))?;

        let rows = result
            .into_rows_result()
            .map_err(|e| EventStoreError::backend(e, "Event read returned no rows"))?;

        let row = rows
            .maybe_first_row::<RecordRow>()
            .map_err(|e| EventStoreError::backend(e, "Failed to decode event row"))?;

        Ok(row.map(record_from_row))
    }

    async fn put(&self, record: &StorageRecord, expectation: &Expectation) -> Result<PutOutcome> {
        let result = match expectation {
            Expectation::Absent => self
                .session
                .query_unpaged(self.cql.insert(true), record_values(record))
                .await
                .map_err(|e| EventStoreError::backend(e, "Failed to insert event"))?,
            Expectation::Previous(previous) => {
                let mut batch = Batch::default();
                batch.append_statement(self.cql.insert(true).as_str());
                batch.append_statement(self.cql.predecessor_check().as_str());

                let check = (
                    previous.event_name.clone(),
                    previous.aggregate_id.clone(),
                    previous.aggregate_version,
                    previous.event_name.clone(),
                    previous.event_data.clone(),
                    previous.timestamp,
                );

                self.session
                    .batch(&batch, (record_values(record), check))
                    .await
                    .map_err(|e| {
                        EventStoreError::backend(e, "Failed to execute conditional batch")
                    })?
            }
        };

        if was_applied(result)? {
            Ok(PutOutcome::Applied)
        } else {
            Ok(PutOutcome::Rejected)
        }
    }

    async fn put_batch(&self, records: &[StorageRecord]) -> Result<()> {
        let insert = self.cql.insert(false);
        let mut batch = Batch::default();
        let mut values = Vec::with_capacity(records.len());

        for record in records {
            batch.append_statement(insert.as_str());
            values.push(record_values(record));
        }

        self.session
            .batch(&batch, values)
            .await
            .map_err(|e| EventStoreError::backend(e, "Failed to execute batch"))?;

        Ok(())
    }

    async fn query_page(
        &self,
        query: &RangeQuery,
        cursor: Option<PagingState>,
    ) -> Result<Page<PagingState>> {
        let mut statement = Statement::new(self.cql.select_range()).with_page_size(self.page_size);
        statement.set_consistency(read_consistency(query.consistent_read));

        let (result, paging) = self
            .session
            .query_single_page(
                statement,
                (query.aggregate_id.as_str(), query.from_version),
                cursor.unwrap_or_else(PagingState::start),
            )
            .await
            .map_err(|e| EventStoreError::backend(e, "Failed to query events"))?;

        let rows = result
            .into_rows_result()
            .map_err(|e| EventStoreError::backend(e, "Event query returned no rows"))?;

        let records = rows
            .rows::<RecordRow>()
            .map_err(|e| EventStoreError::backend(e, "Failed to type event rows"))?
            .map(|row| {
                row.map(record_from_row)
                    .map_err(|e| EventStoreError::backend(e, "Failed to decode event row"))
            })
            .collect::<Result<Vec<_>>>()?;

        let next = match paging.into_paging_control_flow() {
            ControlFlow::Continue(state) => Some(state),
            ControlFlow::Break(()) => None,
        };

        Ok(Page { records, next })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
//
// Statement construction only; conditional writes and paging against a live
// cluster need an integration environment.
//
// ============================================================================
