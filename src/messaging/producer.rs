use std::time::Duration;

use anyhow::Context;
use futures_util::future::try_join_all;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;

use crate::models::Order;

// ============================================================================
// Message Sink Adapter
// ============================================================================
//
// Publishes orders keyed by order_uid so every message for one order lands on
// the same partition. request.required.acks=all: a send resolves only once
// the full replica set has the message.

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const BATCH_SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OrderProducer {
    producer: FutureProducer,
    topic: String,
}

impl OrderProducer {
    pub fn new(brokers: &str, topic: &str) -> anyhow::Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("request.required.acks", "all")
            .set("message.timeout.ms", "30000")
            .create()
            .context("failed to create kafka producer")?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }

    /// Serialize and publish one order, waiting for the full-acknowledgment
    /// delivery report.
    pub async fn send(&self, order: &Order) -> anyhow::Result<()> {
        let payload = serde_json::to_string(order)
            .with_context(|| format!("failed to serialize order {}", order.order_uid))?;

        let record = FutureRecord::to(&self.topic)
            .key(&order.order_uid)
            .payload(&payload);

        self.producer
            .send(record, Timeout::After(SEND_TIMEOUT))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("failed to send order {}: {e}", order.order_uid))?;

        tracing::info!(order_uid = %order.order_uid, topic = %self.topic, "order sent to kafka");
        Ok(())
    }

    /// Publish several orders as one batch. Everything is serialized up front:
    /// a bad order aborts the batch before any network call.
    pub async fn send_batch(&self, orders: &[Order]) -> anyhow::Result<()> {
        if orders.is_empty() {
            return Ok(());
        }

        let mut payloads = Vec::with_capacity(orders.len());
        for order in orders {
            let payload = serde_json::to_string(order)
                .with_context(|| format!("failed to serialize order {}", order.order_uid))?;
            payloads.push(payload);
        }

        let sends = orders.iter().zip(&payloads).map(|(order, payload)| {
            let record = FutureRecord::to(&self.topic)
                .key(&order.order_uid)
                .payload(payload);
            self.producer.send(record, Timeout::After(BATCH_SEND_TIMEOUT))
        });

        try_join_all(sends)
            .await
            .map_err(|(e, _)| anyhow::anyhow!("failed to send order batch: {e}"))?;

        tracing::info!(orders = orders.len(), topic = %self.topic, "sent order batch to kafka");
        Ok(())
    }
}
