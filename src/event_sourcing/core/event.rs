use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Domain Event Payloads and Envelopes
// ============================================================================
//
// A domain event is split in two:
// - the payload (`E: DomainEvent`), built by the caller or by a factory
// - the envelope (aggregate id, version, commit time), owned by the store
//
// The store never mutates a payload. On the way in it pairs a payload with
// an identity and version (`UncommittedEvent`); on the way out it returns an
// `EventEnvelope` whose identity, version and timestamp came from storage.
//
// ============================================================================

/// Domain Event trait
///
/// All event payloads stored through the event store implement this trait.
pub trait DomainEvent: Serialize + Send + Sync {
    /// Discriminator persisted next to the payload
    fn event_name(&self) -> &'static str;

    /// Serialized event-specific fields
    fn payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// An event waiting to be committed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UncommittedEvent<E> {
    pub aggregate_id: String,
    pub aggregate_version: i64,
    pub event: E,
}

impl<E> UncommittedEvent<E> {
    pub fn new(aggregate_id: impl Into<String>, aggregate_version: i64, event: E) -> Self {
        Self {
            aggregate_id: aggregate_id.into(),
            aggregate_version,
            event,
        }
    }
}

/// An event read back from the store, with the metadata the store assigned
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventEnvelope<E> {
    pub aggregate_id: String,
    pub aggregate_version: i64,
    pub timestamp: DateTime<Utc>,
    pub event: E,
}

impl<E> EventEnvelope<E> {
    pub fn into_event(self) -> E {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct TestEvent {
        data: String,
    }

    impl DomainEvent for TestEvent {
        fn event_name(&self) -> &'static str {
            "TestEvent"
        }
    }

    #[test]
    fn test_uncommitted_event_creation() {
        let event = UncommittedEvent::new(
            "agg-1",
            3,
            TestEvent {
                data: "test".to_string(),
            },
        );

        assert_eq!(event.aggregate_id, "agg-1");
        assert_eq!(event.aggregate_version, 3);
        assert_eq!(event.event.event_name(), "TestEvent");
    }

    #[test]
    fn test_default_payload_is_json_of_fields() {
        let event = TestEvent {
            data: "test data".to_string(),
        };

        let payload = event.payload().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(value["data"], "test data");
    }
}
