use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use super::OrderStore;
use crate::error::OrderError;
use crate::models::{Delivery, Item, Order, Payment};

// ============================================================================
// In-memory store for tests
// ============================================================================

/// Test double with the same validation and duplicate-key behavior as the
/// real store, plus call counters and switchable failure modes.
#[derive(Default)]
pub struct MockStore {
    pub orders: Mutex<HashMap<String, Order>>,
    pub get_calls: AtomicUsize,
    pub fail_get: bool,
    pub fail_list_all: bool,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        {
            let mut map = store.orders.lock().unwrap();
            for order in orders {
                map.insert(order.order_uid.clone(), order);
            }
        }
        store
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, order_uid: &str) -> bool {
        self.orders.lock().unwrap().contains_key(order_uid)
    }
}

#[async_trait]
impl OrderStore for MockStore {
    async fn create(&self, order: &Order) -> Result<(), OrderError> {
        order.validate()?;
        let mut map = self.orders.lock().unwrap();
        if map.contains_key(&order.order_uid) {
            return Err(OrderError::AlreadyExists("violation of uniqueness".into()));
        }
        map.insert(order.order_uid.clone(), order.clone());
        Ok(())
    }

    async fn get(&self, order_uid: &str) -> Result<Order, OrderError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get {
            return Err(OrderError::Storage("mock get failure".into()));
        }
        self.orders
            .lock()
            .unwrap()
            .get(order_uid)
            .cloned()
            .ok_or_else(|| OrderError::NotFound("no matching row".into()))
    }

    async fn list_all(&self) -> Result<Vec<Order>, OrderError> {
        if self.fail_list_all {
            return Err(OrderError::Storage("mock list failure".into()));
        }
        Ok(self.orders.lock().unwrap().values().cloned().collect())
    }
}

/// Minimal valid order fixture.
pub fn test_order(order_uid: &str) -> Order {
    Order {
        order_uid: order_uid.to_string(),
        track_number: format!("TRACK-{order_uid}"),
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
            transaction: format!("txn-{order_uid}"),
            request_id: String::new(),
            currency: "USD".into(),
            provider: "wbpay".into(),
            amount: 500,
            payment_dt: 1637907727,
            bank: "alpha".into(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9934930,
            track_number: format!("TRACK-{order_uid}"),
            price: 100,
            rid: format!("rid-{order_uid}"),
            name: "Mascaras".into(),
            sale: 30,
            size: "0".into(),
            total_price: 317,
            nm_id: 2389212,
            brand: "Vivienne Sabo".into(),
            status: 202,
        }],
        locale: "en".into(),
        internal_signature: String::new(),
        customer_id: "test".into(),
        delivery_service: "meest".into(),
        shardkey: "9".into(),
        sm_id: 99,
        date_created: Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).unwrap(),
        oof_shard: "1".into(),
    }
}
