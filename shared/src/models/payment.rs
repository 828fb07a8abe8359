//! Payment and fiscal receipt entities

use super::types::{
    OrderId, PaymentId, PaymentMethod, PaymentStatus, PaymentSystem, ReceiptId, ReceiptStatus,
    ReceiptType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-specific payment attributes.
///
/// Explicit typed fields instead of an opaque key/value blob: the set of
/// attributes gateways actually report is small and stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaymentData {
    /// Id of the payment on the gateway side, set once the payment is started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Gateway page the customer is redirected to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_url: Option<String>,
    /// Where the gateway sends the customer back to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
}

/// A payment against an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub payment_system: PaymentSystem,
    pub status: PaymentStatus,
    pub sum: f64,
    pub payment_method: PaymentMethod,
    /// Set exactly once, the instant `status` first transitions to `Paid`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payed_at: Option<DateTime<Utc>>,
    /// Unpaid payments past this instant are timed out by a periodic driver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Set `true` exactly once an income receipt has successfully been issued.
    pub is_receipt_sent: bool,
    #[serde(default)]
    pub data: PaymentData,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(order_id: OrderId, payment_system: PaymentSystem, sum: f64) -> Self {
        Self {
            id: 0,
            order_id,
            payment_system,
            status: PaymentStatus::NotPaid,
            sum,
            payment_method: PaymentMethod::Prepay,
            payed_at: None,
            expires_at: None,
            is_receipt_sent: false,
            data: PaymentData::default(),
            created_at: Utc::now(),
        }
    }
}

/// Fiscal document (income or refund) issued against a payment.
///
/// `guid` is assigned at creation if absent and defensively again at save
/// time; a persisted receipt always carries a non-null unique guid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentReceipt {
    pub id: ReceiptId,
    pub payment_id: PaymentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub receipt_type: ReceiptType,
    pub status: ReceiptStatus,
    /// Stamped whenever `status` changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PaymentReceipt {
    pub fn new(payment_id: PaymentId, receipt_type: ReceiptType) -> Self {
        Self {
            id: 0,
            payment_id,
            guid: None,
            receipt_type,
            status: ReceiptStatus::Created,
            payed_at: None,
            created_at: Utc::now(),
        }
    }
}
