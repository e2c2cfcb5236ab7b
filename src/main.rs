use std::sync::Arc;

use aggregate_event_store::domain::order::{
    order_event_registry, OrderCancelled, OrderConfirmed, OrderCreated, OrderEvent, OrderItem,
};
use aggregate_event_store::{
    EventStore, EventStoreConfig, EventStoreMetrics, ReadOptions, ScyllaEventTable,
    UncommittedEvent,
};
use chrono::Utc;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, overridable with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,aggregate_event_store=debug")),
        )
        .init();

    let config = EventStoreConfig::from_env()?;
    tracing::info!(
        nodes = ?config.known_nodes,
        keyspace = %config.keyspace,
        "Starting event store demo"
    );

    // === 1. Connect and bootstrap schema ===
    let session: Session = SessionBuilder::new()
        .known_nodes(&config.known_nodes)
        .build()
        .await?;
    let session = Arc::new(session);

    let table = Arc::new(ScyllaEventTable::new(session, &config)?);
    table.ensure_schema().await?;

    let metrics = Arc::new(EventStoreMetrics::new()?);
    let store: EventStore<OrderEvent, _> =
        EventStore::new(table, Arc::new(order_event_registry())).with_metrics(metrics.clone());

    // Ctrl-C cancels whatever call is in flight
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    // === 2. Append an order stream one event at a time ===
    let order_id = Uuid::new_v4().to_string();
    let events = [
        OrderEvent::Created(OrderCreated {
            customer_id: Uuid::new_v4(),
            items: vec![OrderItem {
                product_id: Uuid::new_v4(),
                quantity: 2,
            }],
        }),
        OrderEvent::Confirmed(OrderConfirmed {
            confirmed_at: Utc::now(),
        }),
    ];

    for (version, event) in events.into_iter().enumerate() {
        let version = i64::try_from(version)?;
        store
            .commit(&UncommittedEvent::new(&order_id, version, event), &cancel)
            .await?;
    }

    // === 3. A stale writer loses the race for version 1 ===
    let stale = UncommittedEvent::new(
        &order_id,
        1,
        OrderEvent::Cancelled(OrderCancelled {
            reason: Some("stale writer".to_string()),
            cancelled_by: None,
        }),
    );
    match store.commit(&stale, &cancel).await {
        Err(e) if e.is_concurrency_conflict() => {
            tracing::info!(error = %e, "Stale commit rejected as expected");
        }
        other => anyhow::bail!("expected a concurrency conflict, got {:?}", other),
    }

    // === 4. Read the whole stream back ===
    let history = store
        .read_events(&order_id, ReadOptions::from_version(0).consistent(), &cancel)
        .await?;

    for envelope in &history {
        tracing::info!(
            aggregate_id = %envelope.aggregate_id,
            version = envelope.aggregate_version,
            timestamp = %envelope.timestamp,
            event = ?envelope.event,
            "Replayed event"
        );
    }

    tracing::info!(
        events = history.len(),
        commits = metrics.commits_total.with_label_values(&["applied"]).get(),
        "Demo complete"
    );

    Ok(())
}
