use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;

// ============================================================================
// Domain Models
// ============================================================================
//
// The Order aggregate as it travels over the wire (JSON message value) and
// through the pipeline. Field names are the JSON names; the store maps them
// onto the normalized tables. Validation runs before any write is attempted.

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i64,
}

impl Order {
    /// Check every required field of the aggregate.
    ///
    /// Called by the store before it opens a transaction, so an invalid
    /// aggregate never touches the database.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.order_uid.is_empty() {
            return Err(OrderError::invalid("order_uid cannot be empty"));
        }
        self.delivery.validate()?;
        self.payment.validate()?;
        for (i, item) in self.items.iter().enumerate() {
            item.validate()
                .map_err(|e| e.context(&format!("item {}", i + 1)))?;
        }
        Ok(())
    }
}

impl Delivery {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.name.is_empty() {
            return Err(OrderError::invalid("recipient name is required"));
        }
        if self.phone.is_empty() {
            return Err(OrderError::invalid("recipient phone is required"));
        }
        Ok(())
    }
}

impl Payment {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.transaction.is_empty() {
            return Err(OrderError::invalid("transaction number is required"));
        }
        if self.provider.is_empty() {
            return Err(OrderError::invalid("payment provider is required"));
        }
        if self.amount <= 0 {
            return Err(OrderError::invalid(
                "payment amount must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Item {
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.name.is_empty() {
            return Err(OrderError::invalid("item name is required"));
        }
        if self.price <= 0 {
            return Err(OrderError::invalid("item price must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_order() -> Order {
        serde_json::from_str(CANONICAL_PAYLOAD).unwrap()
    }

    // The well-known sample payload this schema was modeled on.
    const CANONICAL_PAYLOAD: &str = r#"{
        "order_uid": "b563feb7b2b84b6test",
        "track_number": "WBILMTESTTRACK",
        "entry": "WBIL",
        "delivery": {
            "name": "Test Testov",
            "phone": "+9720000000",
            "zip": "2639809",
            "city": "Kiryat Mozkin",
            "address": "Ploshad Mira 15",
            "region": "Kraiot",
            "email": "test@gmail.com"
        },
        "payment": {
            "transaction": "b563feb7b2b84b6test",
            "request_id": "",
            "currency": "USD",
            "provider": "wbpay",
            "amount": 1817,
            "payment_dt": 1637907727,
            "bank": "alpha",
            "delivery_cost": 1500,
            "goods_total": 317,
            "custom_fee": 0
        },
        "items": [
            {
                "chrt_id": 9934930,
                "track_number": "WBILMTESTTRACK",
                "price": 453,
                "rid": "ab4219087a764ae0btest",
                "name": "Mascaras",
                "sale": 30,
                "size": "0",
                "total_price": 317,
                "nm_id": 2389212,
                "brand": "Vivienne Sabo",
                "status": 202
            }
        ],
        "locale": "en",
        "internal_signature": "",
        "customer_id": "test",
        "delivery_service": "meest",
        "shardkey": "9",
        "sm_id": 99,
        "date_created": "2021-11-26T06:22:19Z",
        "oof_shard": "1"
    }"#;

    #[test]
    fn canonical_payload_round_trips() {
        let order = valid_order();
        assert_eq!(order.order_uid, "b563feb7b2b84b6test");
        assert_eq!(order.items.len(), 1);

        let encoded = serde_json::to_string(&order).unwrap();
        let decoded: Order = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, order);
    }

    #[test]
    fn valid_order_passes_validation() {
        assert!(valid_order().validate().is_ok());
    }

    #[test]
    fn empty_order_uid_is_invalid() {
        let mut order = valid_order();
        order.order_uid.clear();
        assert_eq!(order.validate().unwrap_err().kind(), "invalid_data");
    }

    #[test]
    fn empty_delivery_name_is_invalid() {
        let mut order = valid_order();
        order.delivery.name.clear();
        assert_eq!(order.validate().unwrap_err().kind(), "invalid_data");
    }

    #[test]
    fn empty_delivery_phone_is_invalid() {
        let mut order = valid_order();
        order.delivery.phone.clear();
        assert_eq!(order.validate().unwrap_err().kind(), "invalid_data");
    }

    #[test]
    fn empty_payment_transaction_is_invalid() {
        let mut order = valid_order();
        order.payment.transaction.clear();
        assert_eq!(order.validate().unwrap_err().kind(), "invalid_data");
    }

    #[test]
    fn empty_payment_provider_is_invalid() {
        let mut order = valid_order();
        order.payment.provider.clear();
        assert_eq!(order.validate().unwrap_err().kind(), "invalid_data");
    }

    #[test]
    fn non_positive_payment_amount_is_invalid() {
        let mut order = valid_order();
        order.payment.amount = 0;
        assert_eq!(order.validate().unwrap_err().kind(), "invalid_data");
        order.payment.amount = -5;
        assert_eq!(order.validate().unwrap_err().kind(), "invalid_data");
    }

    #[test]
    fn invalid_item_names_the_position() {
        let mut order = valid_order();
        order.items.push(Item {
            name: String::new(),
            ..order.items[0].clone()
        });
        let err = order.validate().unwrap_err();
        assert_eq!(err.kind(), "invalid_data");
        assert!(err.to_string().contains("item 2"));
    }

    #[test]
    fn non_positive_item_price_is_invalid() {
        let mut order = valid_order();
        order.items[0].price = 0;
        assert_eq!(order.validate().unwrap_err().kind(), "invalid_data");
    }

    #[test]
    fn empty_items_are_allowed() {
        let mut order = valid_order();
        order.items.clear();
        assert!(order.validate().is_ok());
    }
}
