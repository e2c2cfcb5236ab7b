use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event_sourcing::core::{DomainEvent, EventRegistry};
use super::value_objects::OrderItem;

// ============================================================================
// Order Events - sample payloads for the event store
// ============================================================================
//
// Each variant is stored under its own discriminator with only the inner
// struct's fields as payload (hence `untagged`). Decoding goes through
// `order_event_registry`, never through this enum's serde impl.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrderEvent {
    Created(OrderCreated),
    ItemsUpdated(OrderItemsUpdated),
    Confirmed(OrderConfirmed),
    Cancelled(OrderCancelled),
}

impl DomainEvent for OrderEvent {
    fn event_name(&self) -> &'static str {
        match self {
            OrderEvent::Created(_) => "OrderCreated",
            OrderEvent::ItemsUpdated(_) => "OrderItemsUpdated",
            OrderEvent::Confirmed(_) => "OrderConfirmed",
            OrderEvent::Cancelled(_) => "OrderCancelled",
        }
    }
}

/// Decoders for every order event discriminator
pub fn order_event_registry() -> EventRegistry<OrderEvent> {
    EventRegistry::new()
        .register("OrderCreated", OrderEvent::Created)
        .register("OrderItemsUpdated", OrderEvent::ItemsUpdated)
        .register("OrderConfirmed", OrderEvent::Confirmed)
        .register("OrderCancelled", OrderEvent::Cancelled)
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Order Created - Initial event in order lifecycle
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderCreated {
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
}

/// Order Items Updated - Order contents modified
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderItemsUpdated {
    pub items: Vec<OrderItem>,
    pub reason: Option<String>,
}

/// Order Confirmed - Order accepted for fulfillment
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderConfirmed {
    pub confirmed_at: DateTime<Utc>,
}

/// Order Cancelled - Order lifecycle ended
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderCancelled {
    pub reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_sourcing::core::EventFactory;

    #[test]
    fn test_payload_holds_only_variant_fields() {
        let event = OrderEvent::Cancelled(OrderCancelled {
            reason: Some("out of stock".to_string()),
            cancelled_by: None,
        });

        let payload = event.payload().unwrap();

        assert_eq!(event.event_name(), "OrderCancelled");
        assert_eq!(payload, r#"{"reason":"out of stock","cancelled_by":null}"#);
    }

    #[test]
    fn test_registry_covers_every_variant() {
        let registry = order_event_registry();
        let events = vec![
            OrderEvent::Created(OrderCreated {
                customer_id: Uuid::new_v4(),
                items: vec![OrderItem {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                }],
            }),
            OrderEvent::ItemsUpdated(OrderItemsUpdated {
                items: vec![],
                reason: Some("customer edit".to_string()),
            }),
            OrderEvent::Confirmed(OrderConfirmed {
                confirmed_at: Utc::now(),
            }),
            OrderEvent::Cancelled(OrderCancelled {
                reason: None,
                cancelled_by: Some(Uuid::new_v4()),
            }),
        ];

        for event in events {
            let rebuilt = registry
                .reconstruct(event.event_name(), &event.payload().unwrap())
                .unwrap();
            assert_eq!(rebuilt, event);
        }
    }
}
