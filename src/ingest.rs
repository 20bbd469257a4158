use std::sync::Arc;

use crate::cache::OrderCache;
use crate::error::OrderError;
use crate::metrics::Metrics;
use crate::store::OrderStore;

// ============================================================================
// Ingestion Orchestrator
// ============================================================================
//
// The single place where persistence and cache population are sequenced.
// Ordering is the invariant: the store commit happens first, the cache write
// second, never the reverse, so the cache can never hold an order the store
// does not.

pub struct Ingestor {
    store: Arc<dyn OrderStore>,
    cache: Arc<OrderCache>,
    metrics: Arc<Metrics>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn OrderStore>, cache: Arc<OrderCache>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            cache,
            metrics,
        }
    }

    /// Persist one order, then write it through to the cache.
    ///
    /// Errors propagate to the consume loop, which logs them and moves on to
    /// the next message; nothing here is retried and nothing is logged twice.
    pub async fn ingest(&self, order: crate::models::Order) -> Result<(), OrderError> {
        let result = self.store.create(&order).await;
        self.metrics.record_ingest(&result);
        result.map_err(|e| e.context(&format!("failed to persist order {}", order.order_uid)))?;

        let order_uid = order.order_uid.clone();
        self.cache.put(order).await;
        tracing::info!(order_uid = %order_uid, "order persisted and cached");
        Ok(())
    }
}
