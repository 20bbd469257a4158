use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Counters for every stage of the pipeline:
// - stream consumption (messages read, messages dropped and why)
// - persistence (orders committed, ingest failures by error kind)
// - cache behavior (hits, misses, current size)
// - HTTP read path (requests by response status)
//
// All metrics are registered with one Registry and scraped via /metrics.

pub struct Metrics {
    registry: Registry,

    pub messages_consumed: IntCounter,
    pub messages_dropped: IntCounterVec,

    pub orders_persisted: IntCounter,
    pub ingest_failures: IntCounterVec,

    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub cache_size: IntGauge,

    pub http_requests: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let messages_consumed = IntCounter::new(
            "messages_consumed_total",
            "Messages read from the stream and handed to the handler",
        )?;
        registry.register(Box::new(messages_consumed.clone()))?;

        let messages_dropped = IntCounterVec::new(
            Opts::new("messages_dropped_total", "Messages skipped by the consume loop"),
            &["reason"],
        )?;
        registry.register(Box::new(messages_dropped.clone()))?;

        let orders_persisted = IntCounter::new(
            "orders_persisted_total",
            "Orders committed to the store and written through to the cache",
        )?;
        registry.register(Box::new(orders_persisted.clone()))?;

        let ingest_failures = IntCounterVec::new(
            Opts::new("ingest_failures_total", "Failed ingest attempts by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(ingest_failures.clone()))?;

        let cache_hits = IntCounter::new("cache_hits_total", "Order cache lookups served locally")?;
        registry.register(Box::new(cache_hits.clone()))?;

        let cache_misses = IntCounter::new(
            "cache_misses_total",
            "Order cache lookups that read through to the store",
        )?;
        registry.register(Box::new(cache_misses.clone()))?;

        let cache_size = IntGauge::new("cache_size", "Orders currently held in the cache")?;
        registry.register(Box::new(cache_size.clone()))?;

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Read endpoint requests by outcome"),
            &["status"],
        )?;
        registry.register(Box::new(http_requests.clone()))?;

        Ok(Self {
            registry,
            messages_consumed,
            messages_dropped,
            orders_persisted,
            ingest_failures,
            cache_hits,
            cache_misses,
            cache_size,
            http_requests,
        })
    }

    /// Registry handle for the /metrics endpoint.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_dropped(&self, reason: &str) {
        self.messages_dropped.with_label_values(&[reason]).inc();
    }

    pub fn record_ingest(&self, result: &Result<(), crate::error::OrderError>) {
        match result {
            Ok(()) => self.orders_persisted.inc(),
            Err(e) => self.ingest_failures.with_label_values(&[e.kind()]).inc(),
        }
    }

    pub fn record_http(&self, status: &str) {
        self.http_requests.with_label_values(&[status]).inc();
    }
}
