use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::OrderError;
use crate::metrics::Metrics;
use crate::models::Order;
use crate::store::OrderStore;

// ============================================================================
// Order Cache
// ============================================================================
//
// In-process view of the order set, keyed by order_uid and guarded by a
// reader/writer lock: unlimited concurrent lookups, exclusive writers. The
// store stays authoritative; entries are written here only after a confirmed
// commit (write-through) or after a successful read-through on a miss
// (cache-aside). Orders are append-only, so there is no eviction.

pub struct OrderCache {
    store: Arc<dyn OrderStore>,
    entries: RwLock<HashMap<String, Order>>,
    metrics: Arc<Metrics>,
}

impl std::fmt::Debug for OrderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderCache").finish_non_exhaustive()
    }
}

impl OrderCache {
    /// Build the cache and warm it from the store. A warm failure is fatal:
    /// the service must not start with an empty view of a non-empty store.
    pub async fn new(
        store: Arc<dyn OrderStore>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, OrderError> {
        let orders = store
            .list_all()
            .await
            .map_err(|e| e.context("cache warm-up"))?;

        let mut entries = HashMap::with_capacity(orders.len());
        for order in orders {
            entries.insert(order.order_uid.clone(), order);
        }
        tracing::info!(orders = entries.len(), "order cache warmed from store");
        metrics.cache_size.set(entries.len() as i64);

        Ok(Self {
            store,
            entries: RwLock::new(entries),
            metrics,
        })
    }

    /// Cached aggregate on hit; read-through to the store on miss, populating
    /// the cache before returning. A store failure on miss surfaces unchanged.
    pub async fn get(&self, order_uid: &str) -> Result<Order, OrderError> {
        if let Some(order) = self.entries.read().await.get(order_uid) {
            self.metrics.cache_hits.inc();
            return Ok(order.clone());
        }

        self.metrics.cache_misses.inc();
        let order = self.store.get(order_uid).await?;

        let mut entries = self.entries.write().await;
        entries.insert(order.order_uid.clone(), order.clone());
        self.metrics.cache_size.set(entries.len() as i64);
        Ok(order)
    }

    /// Unconditional overwrite. Callers must only invoke this after the store
    /// confirmed the commit.
    pub async fn put(&self, order: Order) {
        let mut entries = self.entries.write().await;
        entries.insert(order.order_uid.clone(), order);
        self.metrics.cache_size.set(entries.len() as i64);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::{test_order, MockStore};

    async fn warmed(store: Arc<MockStore>) -> OrderCache {
        OrderCache::new(store, Arc::new(Metrics::new().unwrap()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn warm_failure_fails_construction() {
        let store = Arc::new(MockStore {
            fail_list_all: true,
            ..MockStore::new()
        });
        let err = OrderCache::new(store, Arc::new(Metrics::new().unwrap()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "storage");
    }

    #[tokio::test]
    async fn warmed_get_skips_the_store() {
        let store = Arc::new(MockStore::seeded([test_order("order-1")]));
        let cache = warmed(store.clone()).await;

        let order = cache.get("order-1").await.unwrap();
        assert_eq!(order.order_uid, "order-1");
        assert_eq!(store.get_call_count(), 0);
    }

    #[tokio::test]
    async fn miss_reads_through_and_populates() {
        let store = Arc::new(MockStore::new());
        let cache = warmed(store.clone()).await;
        store.create(&test_order("order-2")).await.unwrap();

        // First lookup misses and reads through; the aggregate round-trips
        // unchanged.
        let order = cache.get("order-2").await.unwrap();
        assert_eq!(order, test_order("order-2"));
        assert_eq!(store.get_call_count(), 1);

        // Second lookup is a hit.
        cache.get("order-2").await.unwrap();
        assert_eq!(store.get_call_count(), 1);
    }

    #[tokio::test]
    async fn miss_surfaces_store_errors_unchanged() {
        let store = Arc::new(MockStore::new());
        let cache = warmed(store.clone()).await;

        let err = cache.get("missing").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn put_overwrites() {
        let store = Arc::new(MockStore::new());
        let cache = warmed(store.clone()).await;

        let mut order = test_order("order-3");
        cache.put(order.clone()).await;
        order.locale = "ru".into();
        cache.put(order.clone()).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("order-3").await.unwrap().locale, "ru");
    }

    #[tokio::test]
    async fn concurrent_gets_observe_full_aggregates() {
        let store = Arc::new(MockStore::seeded([test_order("order-4")]));
        let cache = Arc::new(warmed(store).await);

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    match cache.get("order-4").await {
                        Ok(order) => {
                            // Whole aggregate or nothing.
                            assert_eq!(order.items.len(), 1);
                            assert!(!order.delivery.name.is_empty());
                            assert!(!order.payment.transaction.is_empty());
                        }
                        Err(e) => assert_eq!(e.kind(), "not_found"),
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }
}
