mod postgres;

#[cfg(test)]
pub mod mock;

pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::OrderError;
use crate::models::Order;

// ============================================================================
// Transactional Order Store
// ============================================================================
//
// The authoritative persistence seam. The cache and the ingestion path only
// ever talk to this trait; the production implementation is `PgStore`.

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist one order atomically. All four row sets commit or none do.
    async fn create(&self, order: &Order) -> Result<(), OrderError>;

    /// Reconstruct the full aggregate for one order identifier.
    async fn get(&self, order_uid: &str) -> Result<Order, OrderError>;

    /// Reconstruct every stored order. An empty store yields an empty Vec.
    async fn list_all(&self) -> Result<Vec<Order>, OrderError>;
}
