use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use tokio_util::sync::CancellationToken;

use crate::error::OrderError;
use crate::metrics::Metrics;
use crate::models::Order;

// ============================================================================
// Message Source Adapter
// ============================================================================
//
// Pulls JSON-encoded orders from one Kafka topic and feeds them to a
// caller-supplied handler. The loop has exactly two ways to end: the
// cancellation token fires, or the consumer could not be constructed in the
// first place. Read timeouts are absence of data, not failures; transport
// errors, undecodable payloads, and handler failures are logged and the loop
// keeps moving (at-least-once, no redelivery, no dead-letter queue).

/// Bounded wait for one message before re-checking cancellation.
const READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Short wait used to top up an open batch.
const BATCH_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// One bounded attempt to pull a raw message from the transport.
pub enum SourceRead {
    /// A message arrived; the payload may be absent.
    Message(Option<Vec<u8>>),
    /// Nothing arrived within the bound.
    TimedOut,
    /// Transport-level failure; the loop logs it and keeps going.
    Failed(String),
}

/// Seam over "receive one raw message within a timeout". Production uses
/// Kafka; tests script the reads.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn read(&self, timeout: Duration) -> SourceRead;
}

pub struct KafkaSource {
    consumer: StreamConsumer,
}

#[async_trait]
impl MessageSource for KafkaSource {
    async fn read(&self, timeout: Duration) -> SourceRead {
        match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_) => SourceRead::TimedOut,
            Ok(Err(e)) => SourceRead::Failed(e.to_string()),
            Ok(Ok(msg)) => SourceRead::Message(msg.payload().map(<[u8]>::to_vec)),
        }
    }
}

/// Outcome of one consume-loop iteration.
enum Read {
    /// A decoded order, ready for the handler.
    Order(Order),
    /// A message arrived but was logged and dropped; more may be waiting.
    Skipped,
    /// The read timed out: no messages right now.
    TimedOut,
}

pub struct OrderConsumer<S = KafkaSource> {
    source: S,
    topic: String,
    metrics: Arc<Metrics>,
}

impl OrderConsumer<KafkaSource> {
    pub fn new(
        brokers: &str,
        topic: &str,
        group_id: &str,
        metrics: Arc<Metrics>,
    ) -> anyhow::Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .create()?;
        consumer.subscribe(&[topic])?;

        Ok(Self {
            source: KafkaSource { consumer },
            topic: topic.to_string(),
            metrics,
        })
    }
}

impl<S: MessageSource> OrderConsumer<S> {
    #[cfg(test)]
    fn with_source(source: S, topic: &str, metrics: Arc<Metrics>) -> Self {
        Self {
            source,
            topic: topic.to_string(),
            metrics,
        }
    }

    /// Read one message, bounded by `timeout`, racing the cancellation token.
    async fn read_one(
        &self,
        shutdown: &CancellationToken,
        timeout: Duration,
    ) -> Result<Read, OrderError> {
        let read = tokio::select! {
            // Cancellation is checked first on every iteration.
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!(topic = %self.topic, "consumer cancelled, stopping");
                return Err(OrderError::Cancelled);
            }
            read = self.source.read(timeout) => read,
        };

        let payload = match read {
            SourceRead::TimedOut => return Ok(Read::TimedOut),
            SourceRead::Failed(e) => {
                tracing::warn!(topic = %self.topic, error = %e, "failed to read message");
                self.metrics.record_dropped("read_error");
                return Ok(Read::Skipped);
            }
            SourceRead::Message(None) => {
                tracing::warn!(topic = %self.topic, "message without payload, skipping");
                self.metrics.record_dropped("empty_payload");
                return Ok(Read::Skipped);
            }
            SourceRead::Message(Some(payload)) => payload,
        };

        match serde_json::from_slice::<Order>(&payload) {
            Ok(order) => {
                self.metrics.messages_consumed.inc();
                Ok(Read::Order(order))
            }
            Err(e) => {
                tracing::warn!(topic = %self.topic, error = %e, "failed to deserialize order, skipping");
                self.metrics.record_dropped("deserialize");
                Ok(Read::Skipped)
            }
        }
    }

    /// Consume until cancelled, invoking `handler` per decoded order.
    ///
    /// Always returns `Err(Cancelled)`; any other outcome keeps the loop
    /// alive.
    pub async fn run<F, Fut>(
        &self,
        shutdown: CancellationToken,
        handler: F,
    ) -> Result<(), OrderError>
    where
        F: Fn(Order) -> Fut,
        Fut: Future<Output = Result<(), OrderError>>,
    {
        tracing::info!(topic = %self.topic, "starting to consume orders");

        loop {
            let order = match self.read_one(&shutdown, READ_TIMEOUT).await? {
                Read::Order(order) => order,
                Read::Skipped | Read::TimedOut => continue,
            };

            let order_uid = order.order_uid.clone();
            if let Err(e) = handler(order).await {
                tracing::warn!(order_uid = %order_uid, error = %e, "handler error");
                continue;
            }
            tracing::debug!(order_uid = %order_uid, "processed order");
        }
    }

    /// Batched variant: one bounded read opens a batch, short reads top it up,
    /// then the batch handler runs once. Accumulation ends only when the batch
    /// is full or a read times out; a dropped message does not end the batch.
    pub async fn run_batch<F, Fut>(
        &self,
        shutdown: CancellationToken,
        batch_size: usize,
        handler: F,
    ) -> Result<(), OrderError>
    where
        F: Fn(Vec<Order>) -> Fut,
        Fut: Future<Output = Result<(), OrderError>>,
    {
        tracing::info!(topic = %self.topic, batch_size, "starting to consume orders in batches");

        loop {
            let first = match self.read_one(&shutdown, READ_TIMEOUT).await? {
                Read::Order(order) => order,
                Read::Skipped | Read::TimedOut => continue,
            };

            let mut batch = Vec::with_capacity(batch_size);
            batch.push(first);

            while batch.len() < batch_size {
                match self.read_one(&shutdown, BATCH_POLL_TIMEOUT).await? {
                    Read::Order(order) => batch.push(order),
                    Read::Skipped => continue,
                    // No more messages waiting; ship what we have.
                    Read::TimedOut => break,
                }
            }

            let len = batch.len();
            if let Err(e) = handler(batch).await {
                tracing::warn!(error = %e, "batch handler error");
                continue;
            }
            tracing::debug!(orders = len, "processed batch");
        }
    }
}
