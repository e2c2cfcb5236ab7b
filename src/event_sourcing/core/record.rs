use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::Result;
use super::event::{DomainEvent, EventEnvelope, UncommittedEvent};
use super::factory::EventFactory;

// ============================================================================
// Storage Record - the flat row persisted per event
// ============================================================================
//
// Partition key:  aggregate_id
// Sort key:       aggregate_version
//
// Records are written once and never updated or deleted.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StorageRecord {
    pub aggregate_id: String,
    pub aggregate_version: i64,
    pub event_name: String,
    pub event_data: String,
    pub timestamp: DateTime<Utc>,
}

impl StorageRecord {
    /// Flatten an event for storage, stamping the commit time now
    pub fn encode<E: DomainEvent>(event: &UncommittedEvent<E>) -> Result<Self> {
        Ok(Self {
            aggregate_id: event.aggregate_id.clone(),
            aggregate_version: event.aggregate_version,
            event_name: event.event.event_name().to_string(),
            event_data: event.event.payload()?,
            timestamp: Utc::now(),
        })
    }

    /// Rebuild the typed event through the factory, then attach the stored
    /// identity, version and timestamp
    pub fn reconstitute<E, F>(self, factory: &F) -> Result<EventEnvelope<E>>
    where
        F: EventFactory<E> + ?Sized,
    {
        let event = factory.reconstruct(&self.event_name, &self.event_data)?;

        Ok(EventEnvelope {
            aggregate_id: self.aggregate_id,
            aggregate_version: self.aggregate_version,
            timestamp: self.timestamp,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::core::{EventRegistry, EventStoreError};

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct Renamed {
        name: String,
    }

    impl DomainEvent for Renamed {
        fn event_name(&self) -> &'static str {
            "Renamed"
        }
    }

    #[test]
    fn test_encode_copies_key_and_stamps_time() {
        let before = Utc::now();
        let event = UncommittedEvent::new(
            "thing-7",
            2,
            Renamed {
                name: "new".to_string(),
            },
        );

        let record = StorageRecord::encode(&event).unwrap();

        assert_eq!(record.aggregate_id, "thing-7");
        assert_eq!(record.aggregate_version, 2);
        assert_eq!(record.event_name, "Renamed");
        assert_eq!(record.event_data, r#"{"name":"new"}"#);
        assert!(record.timestamp >= before);
    }

    #[test]
    fn test_reconstitute_attaches_stored_metadata() {
        let registry = EventRegistry::new().register("Renamed", |e: Renamed| e);
        let timestamp = Utc::now();
        let record = StorageRecord {
            aggregate_id: "thing-7".to_string(),
            aggregate_version: 5,
            event_name: "Renamed".to_string(),
            event_data: r#"{"name":"stored"}"#.to_string(),
            timestamp,
        };

        let envelope = record.reconstitute(&registry).unwrap();

        assert_eq!(envelope.aggregate_id, "thing-7");
        assert_eq!(envelope.aggregate_version, 5);
        assert_eq!(envelope.timestamp, timestamp);
        assert_eq!(envelope.event.name, "stored");
    }

    #[test]
    fn test_reconstitute_propagates_unknown_type() {
        let registry: EventRegistry<Renamed> = EventRegistry::new();
        let record = StorageRecord {
            aggregate_id: "thing-7".to_string(),
            aggregate_version: 0,
            event_name: "Deleted".to_string(),
            event_data: "{}".to_string(),
            timestamp: Utc::now(),
        };

        let result = record.reconstitute(&registry);

        assert!(matches!(result, Err(EventStoreError::UnknownEventType(_))));
    }
}
