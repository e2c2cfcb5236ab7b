// ============================================================================
// Event Sourcing Store - Generic Persistence Layer
// ============================================================================
//
// - `EventStore`: writer and reader, generic over payload and table
// - `EventTable`: the backing-store contract
// - `ScyllaEventTable`: ScyllaDB implementation (lightweight transactions)
// - `InMemoryEventTable`: in-process implementation for tests and local runs
//
// ============================================================================

pub mod event_store;
pub mod memory;
pub mod scylla_table;
pub mod table;

pub use event_store::{EventStore, ReadOptions, DEFAULT_FROM_VERSION};
pub use memory::InMemoryEventTable;
pub use scylla_table::{CqlStatements, ScyllaEventTable};
pub use table::{EventTable, Expectation, Page, PutOutcome, RangeQuery};
