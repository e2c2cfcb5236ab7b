use std::collections::HashMap;

use serde::de::DeserializeOwned;

use super::error::{EventStoreError, Result};

// ============================================================================
// Event Reconstitution
// ============================================================================
//
// Turns a stored discriminator + payload back into a typed event. The store
// only depends on the `EventFactory` trait; `EventRegistry` is an open
// registry the application fills with one decoder per discriminator.
//
// ============================================================================

/// Builds a typed event payload from its stored form
pub trait EventFactory<E>: Send + Sync {
    /// Fails with `UnknownEventType` when the discriminator is not known
    fn reconstruct(&self, event_name: &str, event_data: &str) -> Result<E>;
}

type Decoder<E> = Box<dyn Fn(&str) -> Result<E> + Send + Sync>;

/// Discriminator → decoder map
pub struct EventRegistry<E> {
    decoders: HashMap<String, Decoder<E>>,
}

impl<E> EventRegistry<E> {
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Register a payload type under a discriminator, lifting it into `E`
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register<T, F>(mut self, event_name: &str, lift: F) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> E + Send + Sync + 'static,
        E: 'static,
    {
        self.decoders.insert(
            event_name.to_string(),
            Box::new(move |data: &str| {
                let payload: T = serde_json::from_str(data)?;
                Ok(lift(payload))
            }),
        );
        self
    }

    pub fn contains(&self, event_name: &str) -> bool {
        self.decoders.contains_key(event_name)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl<E> Default for EventRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventFactory<E> for EventRegistry<E> {
    fn reconstruct(&self, event_name: &str, event_data: &str) -> Result<E> {
        let decoder = self
            .decoders
            .get(event_name)
            .ok_or_else(|| EventStoreError::UnknownEventType(event_name.to_string()))?;

        decoder(event_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Opened {
        owner: String,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Closed {
        reason: Option<String>,
    }

    #[derive(Debug, PartialEq)]
    enum AccountEvent {
        Opened(Opened),
        Closed(Closed),
    }

    fn registry() -> EventRegistry<AccountEvent> {
        EventRegistry::new()
            .register("AccountOpened", AccountEvent::Opened)
            .register("AccountClosed", AccountEvent::Closed)
    }

    #[test]
    fn test_reconstruct_dispatches_on_discriminator() {
        let registry = registry();

        let opened = registry
            .reconstruct("AccountOpened", r#"{"owner":"ada"}"#)
            .unwrap();
        let closed = registry.reconstruct("AccountClosed", r#"{"reason":null}"#).unwrap();

        assert_eq!(
            opened,
            AccountEvent::Opened(Opened {
                owner: "ada".to_string()
            })
        );
        assert_eq!(closed, AccountEvent::Closed(Closed { reason: None }));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unknown_discriminator_is_an_error() {
        let result = registry().reconstruct("AccountFrozen", "{}");

        match result {
            Err(EventStoreError::UnknownEventType(name)) => assert_eq!(name, "AccountFrozen"),
            other => panic!("expected UnknownEventType, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_payload_is_a_serialization_error() {
        let result = registry().reconstruct("AccountOpened", r#"{"owner":42}"#);

        assert!(matches!(result, Err(EventStoreError::Serialization(_))));
    }
}
