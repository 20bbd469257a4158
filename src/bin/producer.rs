use std::time::Duration;

use chrono::Utc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_pipeline::{Config, Delivery, Item, Order, OrderProducer, Payment};

// Load generator: publishes one synthetic order every tick until interrupted.

const TICK: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let producer = OrderProducer::new(&config.kafka_brokers, &config.kafka_topic)?;
    tracing::info!(topic = %config.kafka_topic, "producer started");

    let mut ticker = tokio::time::interval(TICK);
    let mut counter: i64 = 1;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down producer");
                return Ok(());
            }
            _ = ticker.tick() => {
                let order = synthetic_order(counter);
                match producer.send(&order).await {
                    Ok(()) => tracing::info!(n = counter, order_uid = %order.order_uid, "message sent"),
                    Err(e) => tracing::error!(error = %e, "failed to send order"),
                }
                counter += 1;
            }
        }
    }
}

fn synthetic_order(counter: i64) -> Order {
    Order {
        order_uid: format!("test-order-{counter}"),
        track_number: format!("WBILMTESTTRACK{counter}"),
        entry: "WBIL".into(),
        delivery: Delivery {
            name: "Test Testov".into(),
            phone: "+9720000000".into(),
            zip: "2639809".into(),
            city: "Kiryat Mozkin".into(),
            address: "Ploshad Mira 15".into(),
            region: "Kraiot".into(),
            email: "test@gmail.com".into(),
        },
        payment: Payment {
            transaction: format!("txn-{}", uuid::Uuid::new_v4()),
            request_id: format!("internal-request-id-{counter}"),
            currency: "USD".into(),
            provider: "wbpay".into(),
            amount: 1817 + counter * 100,
            payment_dt: Utc::now().timestamp(),
            bank: "alpha".into(),
            delivery_cost: 1500,
            goods_total: 317 + counter * 100,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9_934_930 + counter,
            track_number: format!("WBILMTESTTRACK{counter}"),
            price: 453 + counter * 10,
            rid: format!("rid-{}", uuid::Uuid::new_v4()),
            name: format!("Product {counter}"),
            sale: 30,
            size: "0".into(),
            total_price: 317 + counter * 100,
            nm_id: 2_389_212 + counter,
            brand: "Vivienne Sabo".into(),
            status: 202,
        }],
        locale: "en".into(),
        internal_signature: "internal-sig".into(),
        customer_id: format!("customer-{counter}"),
        delivery_service: "meest".into(),
        shardkey: "shard-1".into(),
        sm_id: 99,
        date_created: Utc::now(),
        oof_shard: "oof-1".into(),
    }
}
