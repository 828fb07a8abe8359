//! Shared id aliases and status enums for the order management core

use serde::{Deserialize, Serialize};

// ============================================================================
// Ids
// ============================================================================

/// Entity ids are opaque integers assigned by the store.
/// `0` means "not yet persisted"; the store allocates a fresh id on save.
pub type BasketId = u64;
pub type BasketItemId = u64;
pub type OrderId = u64;
pub type PaymentId = u64;
pub type ReceiptId = u64;
pub type DeliveryId = u64;
pub type ShipmentId = u64;
pub type ShipmentItemId = u64;
pub type ShipmentPackageId = u64;
pub type ShipmentPackageItemId = u64;
pub type ReturnId = u64;
pub type ReturnItemId = u64;
pub type CommentId = u64;

/// Ids owned by external directories (customers, merchants, offers, pickup
/// points) — never allocated locally.
pub type CustomerId = u64;
pub type MerchantId = u64;
pub type OfferId = u64;
pub type PickupPointId = u64;

// ============================================================================
// Basket / Order
// ============================================================================

/// What a basket (and the order created from it) sells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BasketType {
    #[default]
    Product,
    MasterClass,
    Certificate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Created,
    InProcessing,
    Delivering,
    Done,
    Canceled,
}

// ============================================================================
// Payments
// ============================================================================

/// Status of a single payment; also the order-level aggregate computed by the
/// payment status engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    Hold,
    Paid,
    Timeout,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Prepay,
    Postpay,
}

/// Gateway a payment is routed through. The provider registry maps each
/// variant to a `PaymentProviderCapability` implementation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentSystem {
    Yandex,
    CreditLine,
}

/// External credit-line provider selector stored on the order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditSystem {
    CreditLine,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptType {
    #[default]
    Income,
    Refund,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    #[default]
    Created,
    Sent,
    Confirmed,
}

// ============================================================================
// Delivery / Shipments
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod {
    #[default]
    Courier,
    Pickup,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    #[default]
    Created,
    /// Awaiting merchant approval. Force-set by the shipment state machine
    /// when a paid shipment belongs to a merchant that requires approval.
    Checking,
    Approved,
    Dispatched,
    Completed,
}

/// Shipment-level payment status.
///
/// `PaidRequiresApproval` is wire code 3 in the legacy marketplace API; it is
/// the trigger for the `Checking` correction in the shipment state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentPaymentStatus {
    #[default]
    NotPaid,
    Hold,
    Paid,
    PaidRequiresApproval,
}

// ============================================================================
// Returns / History
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnStatus {
    #[default]
    New,
    Processing,
    Done,
}

/// Kind of lifecycle event recorded in the audit history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryType {
    Create,
    Update,
    Delete,
    Comment,
}

/// Entity a history record refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryEntity {
    Order,
    BasketItem,
    Comment,
}
