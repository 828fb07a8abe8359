//! Delivery, shipment and shipment package entities

use super::types::{
    BasketItemId, DeliveryId, DeliveryMethod, MerchantId, OrderId, PickupPointId, ShipmentId,
    ShipmentItemId, ShipmentPackageId, ShipmentPackageItemId, ShipmentPaymentStatus,
    ShipmentStatus,
};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A delivery leg of an order. Owns one shipment per participating merchant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    pub id: DeliveryId,
    pub order_id: OrderId,
    pub delivery_method: DeliveryMethod,
    /// Scheduled date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_at: Option<DateTime<Utc>>,
    /// Scheduled window within the day.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<NaiveTime>,
    /// Pickup point, for `DeliveryMethod::Pickup`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_id: Option<PickupPointId>,
}

impl Delivery {
    pub fn new(order_id: OrderId, delivery_method: DeliveryMethod) -> Self {
        Self {
            id: 0,
            order_id,
            delivery_method,
            delivery_at: None,
            time_start: None,
            time_end: None,
            point_id: None,
        }
    }
}

/// Merchant-scoped portion of a delivery, carrying its own approval and
/// payment status. `qty` and `cost` are aggregates recomputed from the
/// shipment's items by the shipment state machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shipment {
    pub id: ShipmentId,
    pub delivery_id: DeliveryId,
    pub merchant_id: MerchantId,
    pub status: ShipmentStatus,
    pub payment_status: ShipmentPaymentStatus,
    pub qty: f64,
    pub cost: f64,
}

impl Shipment {
    pub fn new(delivery_id: DeliveryId, merchant_id: MerchantId) -> Self {
        Self {
            id: 0,
            delivery_id,
            merchant_id,
            status: ShipmentStatus::Created,
            payment_status: ShipmentPaymentStatus::NotPaid,
            qty: 0.0,
            cost: 0.0,
        }
    }
}

/// Links a basket item into a shipment. Deleted before its basket item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentItem {
    pub id: ShipmentItemId,
    pub shipment_id: ShipmentId,
    pub basket_item_id: BasketItemId,
}

/// Physical package within a shipment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentPackage {
    pub id: ShipmentPackageId,
    pub shipment_id: ShipmentId,
    /// Package weight in grams, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Links a basket item into a shipment package. Deleted before its basket
/// item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShipmentPackageItem {
    pub id: ShipmentPackageItemId,
    pub package_id: ShipmentPackageId,
    pub basket_item_id: BasketItemId,
    pub qty: f64,
}
