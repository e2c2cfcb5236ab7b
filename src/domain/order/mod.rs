// ============================================================================
// Order Domain - sample events stored through the generic event store
// ============================================================================

pub mod events;
pub mod value_objects;

pub use events::*;
pub use value_objects::*;
