// ============================================================================
// Event Sourcing Core - Generic Abstractions
// ============================================================================
//
// Storage-agnostic pieces shared by the writer and the reader:
// - event payload trait and envelopes
// - the flat storage record and its codec
// - event reconstitution (factory / registry)
// - the error type
//
// ============================================================================

pub mod error;
pub mod event;
pub mod factory;
pub mod record;

pub use error::{EventStoreError, Result};
pub use event::{DomainEvent, EventEnvelope, UncommittedEvent};
pub use factory::{EventFactory, EventRegistry};
pub use record::StorageRecord;
