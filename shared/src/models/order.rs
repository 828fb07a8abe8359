//! Order, order return and comment entities

use super::types::{
    BasketId, BasketItemId, BasketType, CommentId, CreditSystem, CustomerId, OrderId, OrderStatus,
    PaymentStatus, ReturnId, ReturnItemId, ReturnStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marketplace order, created from a basket.
///
/// Every change to `status`, `payment_status` or `is_problem` stamps the
/// paired `*_at` timestamp atomically with the value change — never one
/// without the other. Stamping is done by the order observer at save time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub basket_id: BasketId,
    pub customer_id: CustomerId,
    /// Human-facing order number.
    pub number: String,
    pub order_type: BasketType,
    /// Total order price.
    pub price: f64,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_at: Option<DateTime<Utc>>,
    /// Aggregate of the order's payments, maintained by the payment status
    /// engine.
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status_at: Option<DateTime<Utc>>,
    pub is_problem: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_problem_at: Option<DateTime<Utc>>,
    /// Selector for the external credit provider financing this order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_system: Option<CreditSystem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        basket_id: BasketId,
        customer_id: CustomerId,
        number: impl Into<String>,
        order_type: BasketType,
        price: f64,
    ) -> Self {
        Self {
            id: 0,
            basket_id,
            customer_id,
            number: number.into(),
            order_type,
            price,
            status: OrderStatus::Created,
            status_at: None,
            payment_status: PaymentStatus::NotPaid,
            payment_status_at: None,
            is_problem: false,
            is_problem_at: None,
            credit_system: None,
            created_at: Utc::now(),
        }
    }
}

/// Return claim against an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderReturn {
    pub id: ReturnId,
    pub order_id: OrderId,
    pub status: ReturnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_at: Option<DateTime<Utc>>,
    /// Total refund amount claimed. Changing it triggers a delta refund.
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

impl OrderReturn {
    pub fn new(order_id: OrderId, price: f64) -> Self {
        Self {
            id: 0,
            order_id,
            status: ReturnStatus::New,
            status_at: None,
            price,
            created_at: Utc::now(),
        }
    }
}

/// Line item of a return claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderReturnItem {
    pub id: ReturnItemId,
    pub return_id: ReturnId,
    pub basket_item_id: BasketItemId,
    pub qty: f64,
    pub price: f64,
}

/// Free-form operator comment on an order; mirrored into the history log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderComment {
    pub id: CommentId,
    pub order_id: OrderId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl OrderComment {
    pub fn new(order_id: OrderId, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            order_id,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}
