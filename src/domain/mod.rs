// ============================================================================
// Domain Layer
// ============================================================================
//
// Domain event payloads live here, separate from the event store. Folding
// events into aggregate state is left to the application.
//
// ============================================================================

pub mod order;
