// ============================================================================
// Aggregate Event Store
// ============================================================================
//
// Append-only event store for event-sourced aggregates:
// - single commits chained on the previous version (optimistic concurrency)
// - unconditional batch commits for bulk loads
// - paged reads reconstituted through a pluggable event factory
//
// ScyllaDB is the production backing table; an in-memory table ships for
// tests and local runs.
//
// ============================================================================

pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod metrics;

pub use config::{ConfigError, EventStoreConfig};
pub use event_sourcing::{
    DomainEvent, EventEnvelope, EventFactory, EventRegistry, EventStore, EventStoreError,
    EventTable, InMemoryEventTable, ReadOptions, ScyllaEventTable, StorageRecord,
    UncommittedEvent,
};
pub use metrics::EventStoreMetrics;
