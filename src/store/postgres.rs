use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::OrderStore;
use crate::error::OrderError;
use crate::models::{Delivery, Item, Order, Payment};

// ============================================================================
// Postgres Order Store
// ============================================================================
//
// One order becomes four related row sets: delivery and payment rows are
// inserted first (each returning a surrogate id), then the order row
// referencing both, then the items referencing the order by its natural
// identifier. Everything happens inside a single transaction; sqlx rolls the
// transaction back when it is dropped without a commit.

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS delivery (
    id      BIGSERIAL PRIMARY KEY,
    name    TEXT NOT NULL,
    phone   TEXT NOT NULL,
    zip     TEXT NOT NULL,
    city    TEXT NOT NULL,
    address TEXT NOT NULL,
    region  TEXT NOT NULL,
    email   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS payment (
    id            BIGSERIAL PRIMARY KEY,
    transaction   TEXT NOT NULL UNIQUE,
    request_id    TEXT NOT NULL,
    currency      TEXT NOT NULL,
    provider      TEXT NOT NULL,
    amount        BIGINT NOT NULL CHECK (amount > 0),
    payment_dt    BIGINT NOT NULL,
    bank          TEXT NOT NULL,
    delivery_cost BIGINT NOT NULL,
    goods_total   BIGINT NOT NULL,
    custom_fee    BIGINT NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
    order_uid          TEXT PRIMARY KEY,
    track_number       TEXT NOT NULL,
    entry              TEXT NOT NULL,
    delivery_id        BIGINT NOT NULL REFERENCES delivery (id),
    payment_id         BIGINT NOT NULL REFERENCES payment (id),
    locale             TEXT NOT NULL,
    internal_signature TEXT NOT NULL,
    customer_id        TEXT NOT NULL,
    delivery_service   TEXT NOT NULL,
    shardkey           TEXT NOT NULL,
    sm_id              BIGINT NOT NULL,
    date_created       TIMESTAMPTZ NOT NULL,
    oof_shard          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS item (
    id           BIGSERIAL PRIMARY KEY,
    chrt_id      BIGINT NOT NULL,
    track_number TEXT NOT NULL,
    price        BIGINT NOT NULL CHECK (price > 0),
    rid          TEXT NOT NULL,
    name         TEXT NOT NULL,
    sale         BIGINT NOT NULL,
    size         TEXT NOT NULL,
    total_price  BIGINT NOT NULL,
    nm_id        BIGINT NOT NULL,
    brand        TEXT NOT NULL,
    status       BIGINT NOT NULL,
    order_uid    TEXT NOT NULL REFERENCES orders (order_uid)
);
"#;

/// Flat projection of the orders table; delivery/payment arrive as surrogate
/// ids and are resolved by follow-up reads.
#[derive(sqlx::FromRow)]
struct OrderRow {
    order_uid: String,
    track_number: String,
    entry: String,
    delivery_id: i64,
    payment_id: i64,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i64,
    date_created: DateTime<Utc>,
    oof_shard: String,
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and bootstrap the schema.
    pub async fn new(database_url: &str) -> Result<Self, OrderError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| OrderError::from_sqlx(e).context("failed to connect to postgres"))?;

        let store = Self { pool };
        store.bootstrap().await?;
        Ok(store)
    }

    async fn bootstrap(&self) -> Result<(), OrderError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| OrderError::from_sqlx(e).context("schema bootstrap"))?;
        tracing::info!("postgres schema ready");
        Ok(())
    }

    async fn get_delivery(&self, id: i64) -> Result<Delivery, OrderError> {
        sqlx::query_as(
            "SELECT name, phone, zip, city, address, region, email FROM delivery WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(OrderError::from_sqlx)
    }

    async fn get_payment(&self, id: i64) -> Result<Payment, OrderError> {
        sqlx::query_as(
            "SELECT transaction, request_id, currency, provider, amount, payment_dt, bank, \
             delivery_cost, goods_total, custom_fee FROM payment WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(OrderError::from_sqlx)
    }

    async fn get_items(&self, order_uid: &str) -> Result<Vec<Item>, OrderError> {
        // ORDER BY id reproduces insertion order, which is the sequence order
        // of the original message.
        sqlx::query_as(
            "SELECT chrt_id, track_number, price, rid, name, sale, size, total_price, nm_id, \
             brand, status FROM item WHERE order_uid = $1 ORDER BY id",
        )
        .bind(order_uid)
        .fetch_all(&self.pool)
        .await
        .map_err(OrderError::from_sqlx)
    }

    /// Resolve the surrogate references of one order row into the aggregate.
    async fn assemble(&self, row: OrderRow) -> Result<Order, OrderError> {
        let delivery = self
            .get_delivery(row.delivery_id)
            .await
            .map_err(|e| e.context("delivery data retrieval error"))?;
        let payment = self
            .get_payment(row.payment_id)
            .await
            .map_err(|e| e.context("payment data retrieval error"))?;
        let items = self
            .get_items(&row.order_uid)
            .await
            .map_err(|e| e.context("order items retrieval error"))?;

        Ok(Order {
            order_uid: row.order_uid,
            track_number: row.track_number,
            entry: row.entry,
            delivery,
            payment,
            items,
            locale: row.locale,
            internal_signature: row.internal_signature,
            customer_id: row.customer_id,
            delivery_service: row.delivery_service,
            shardkey: row.shardkey,
            sm_id: row.sm_id,
            date_created: row.date_created,
            oof_shard: row.oof_shard,
        })
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create(&self, order: &Order) -> Result<(), OrderError> {
        // Fail fast before opening a transaction.
        order.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| OrderError::from_sqlx(e).context("failed to begin transaction"))?;

        let (delivery_id,): (i64,) = sqlx::query_as(
            "INSERT INTO delivery (name, phone, zip, city, address, region, email) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(&order.delivery.name)
        .bind(&order.delivery.phone)
        .bind(&order.delivery.zip)
        .bind(&order.delivery.city)
        .bind(&order.delivery.address)
        .bind(&order.delivery.region)
        .bind(&order.delivery.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| OrderError::from_sqlx(e).context("delivery creation error"))?;

        let (payment_id,): (i64,) = sqlx::query_as(
            "INSERT INTO payment (transaction, request_id, currency, provider, amount, \
             payment_dt, bank, delivery_cost, goods_total, custom_fee) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(&order.payment.transaction)
        .bind(&order.payment.request_id)
        .bind(&order.payment.currency)
        .bind(&order.payment.provider)
        .bind(order.payment.amount)
        .bind(order.payment.payment_dt)
        .bind(&order.payment.bank)
        .bind(order.payment.delivery_cost)
        .bind(order.payment.goods_total)
        .bind(order.payment.custom_fee)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| OrderError::from_sqlx(e).context("payment creation error"))?;

        sqlx::query(
            "INSERT INTO orders (order_uid, track_number, entry, delivery_id, payment_id, \
             locale, internal_signature, customer_id, delivery_service, shardkey, sm_id, \
             date_created, oof_shard) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(delivery_id)
        .bind(payment_id)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut *tx)
        .await
        .map_err(|e| OrderError::from_sqlx(e).context("order creation error"))?;

        for (i, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO item (chrt_id, track_number, price, rid, name, sale, size, \
                 total_price, nm_id, brand, status, order_uid) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(item.chrt_id)
            .bind(&item.track_number)
            .bind(item.price)
            .bind(&item.rid)
            .bind(&item.name)
            .bind(item.sale)
            .bind(&item.size)
            .bind(item.total_price)
            .bind(item.nm_id)
            .bind(&item.brand)
            .bind(item.status)
            .bind(&order.order_uid)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                OrderError::from_sqlx(e).context(&format!("item {} creation error", i + 1))
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| OrderError::from_sqlx(e).context("failed to commit transaction"))?;

        Ok(())
    }

    async fn get(&self, order_uid: &str) -> Result<Order, OrderError> {
        if order_uid.is_empty() {
            return Err(OrderError::invalid("order_uid cannot be empty"));
        }

        let row: OrderRow = sqlx::query_as(
            "SELECT order_uid, track_number, entry, delivery_id, payment_id, locale, \
             internal_signature, customer_id, delivery_service, shardkey, sm_id, \
             date_created, oof_shard FROM orders WHERE order_uid = $1",
        )
        .bind(order_uid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| OrderError::from_sqlx(e).context("order retrieval error"))?;

        self.assemble(row).await
    }

    async fn list_all(&self) -> Result<Vec<Order>, OrderError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            "SELECT order_uid, track_number, entry, delivery_id, payment_id, locale, \
             internal_signature, customer_id, delivery_service, shardkey, sm_id, \
             date_created, oof_shard FROM orders",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| OrderError::from_sqlx(e).context("order query error"))?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let uid = row.order_uid.clone();
            let order = self
                .assemble(row)
                .await
                .map_err(|e| e.context(&format!("order {uid}")))?;
            orders.push(order);
        }
        Ok(orders)
    }
}
