// ============================================================================
// Order Pipeline
// ============================================================================
//
// Ingests order events from Kafka, persists each order atomically across the
// normalized tables in Postgres, and serves point lookups from an in-process
// write-through cache. The store is authoritative; the cache is a derived
// view that is warmed at startup and never written ahead of a commit.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod ingest;
pub mod messaging;
pub mod metrics;
pub mod models;
pub mod store;

pub use cache::OrderCache;
pub use config::Config;
pub use error::OrderError;
pub use ingest::Ingestor;
pub use messaging::{OrderConsumer, OrderProducer};
pub use metrics::Metrics;
pub use models::{Delivery, Item, Order, Payment};
pub use store::{OrderStore, PgStore};
