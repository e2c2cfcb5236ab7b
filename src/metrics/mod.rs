use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus metrics for the event store
// ============================================================================
//
// Provides metrics for:
// - Single commits by outcome (applied, conflict, error)
// - Events written through batch commits
// - Pages and events read back
// - Failed batch commits and reads
// - Per-operation latency
//
// Metrics live in their own registry; the embedding application decides how
// to expose it.
// ============================================================================

pub struct EventStoreMetrics {
    registry: Registry,

    pub commits_total: IntCounterVec,
    pub batch_events_total: IntCounter,
    pub pages_read_total: IntCounter,
    pub events_read_total: IntCounter,
    pub operation_errors_total: IntCounterVec,
    pub operation_duration: HistogramVec,
}

impl EventStoreMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let commits_total = IntCounterVec::new(
            Opts::new("event_store_commits_total", "Single event commits by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(commits_total.clone()))?;

        let batch_events_total = IntCounter::new(
            "event_store_batch_events_total",
            "Events written through batch commits",
        )?;
        registry.register(Box::new(batch_events_total.clone()))?;

        let pages_read_total = IntCounter::new(
            "event_store_pages_read_total",
            "Range query pages fetched from the backing store",
        )?;
        registry.register(Box::new(pages_read_total.clone()))?;

        let events_read_total = IntCounter::new(
            "event_store_events_read_total",
            "Events returned by reads",
        )?;
        registry.register(Box::new(events_read_total.clone()))?;

        let operation_errors_total = IntCounterVec::new(
            Opts::new(
                "event_store_operation_errors_total",
                "Failed batch commits and reads",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(operation_errors_total.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "event_store_operation_duration_seconds",
                "Event store operation duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            registry,
            commits_total,
            batch_events_total,
            pages_read_total,
            events_read_total,
            operation_errors_total,
            operation_duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// `outcome` is one of `applied`, `conflict`, `error`
    pub fn record_commit(&self, outcome: &str, duration_secs: f64) {
        self.commits_total.with_label_values(&[outcome]).inc();
        self.operation_duration
            .with_label_values(&["commit"])
            .observe(duration_secs);
    }

    /// Events are only counted when the batch succeeded
    pub fn record_batch(&self, event_count: usize, duration_secs: f64, success: bool) {
        if success {
            self.batch_events_total.inc_by(event_count as u64);
        } else {
            self.operation_errors_total
                .with_label_values(&["commit_batch"])
                .inc();
        }
        self.operation_duration
            .with_label_values(&["commit_batch"])
            .observe(duration_secs);
    }

    pub fn record_page(&self) {
        self.pages_read_total.inc();
    }

    pub fn record_read(&self, event_count: usize, duration_secs: f64, success: bool) {
        if success {
            self.events_read_total.inc_by(event_count as u64);
        } else {
            self.operation_errors_total.with_label_values(&["read"]).inc();
        }
        self.operation_duration
            .with_label_values(&["read"])
            .observe(duration_secs);
    }
}
