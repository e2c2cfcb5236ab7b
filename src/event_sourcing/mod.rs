// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// Generic, reusable event store. Sample domain events are in src/domain/
//
// ============================================================================

pub mod core;
pub mod store;

pub use self::core::*;
pub use self::store::*;
