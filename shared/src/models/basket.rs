//! Basket and basket item entities

use super::types::{BasketId, BasketItemId, BasketType, CustomerId, OfferId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shopping basket. Owns an ordered set of items and is attached to at most
/// one order over its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Basket {
    pub id: BasketId,
    pub customer_id: CustomerId,
    pub basket_type: BasketType,
    /// Becomes `true` exactly once, when an order referencing this basket is
    /// created. An attached basket is immutable except through its items.
    pub belongs_to_order: bool,
    pub created_at: DateTime<Utc>,
}

impl Basket {
    pub fn new(customer_id: CustomerId, basket_type: BasketType) -> Self {
        Self {
            id: 0,
            customer_id,
            basket_type,
            belongs_to_order: false,
            created_at: Utc::now(),
        }
    }
}

/// A line in a basket. May be linked (0 or 1) to a shipment item and a
/// shipment package item once the order is split into shipments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BasketItem {
    pub id: BasketItemId,
    pub basket_id: BasketId,
    pub offer_id: OfferId,
    pub name: String,
    /// Quantity, fractional units allowed (weight goods).
    pub qty: f64,
    /// Unit price; `None` until priced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub reserved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_by: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_at: Option<DateTime<Utc>>,
}

impl BasketItem {
    pub fn new(basket_id: BasketId, offer_id: OfferId, name: impl Into<String>, qty: f64) -> Self {
        Self {
            id: 0,
            basket_id,
            offer_id,
            name: name.into(),
            qty,
            price: None,
            reserved: false,
            reserved_by: None,
            reserved_at: None,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}
