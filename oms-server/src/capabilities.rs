//! External collaborator contracts
//!
//! The engine consumes, never implements, these capabilities. Concrete
//! adapters (gateway SDK wrappers, HTTP clients) live with the host
//! application; tests register recording mocks.
//!
//! Two failure regimes apply (see DESIGN.md):
//! - best-effort capabilities (search index, marketing notify, SMS) — the
//!   effect runner logs and swallows their errors;
//! - critical-path capabilities (payment provider receipt/refund calls) —
//!   errors propagate as `OmsError::Capability` and the triggering flag is
//!   left unset so the action retries on the next qualifying event.

use shared::models::{
    CustomerId, MerchantId, OfferId, Order, OrderId, Payment, PaymentReceipt, PaymentStatus,
    PickupPointId,
};
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by an external capability.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CapabilityError(pub String);

impl CapabilityError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// SMS delivery, best-effort.
pub trait NotificationSender: Send + Sync {
    fn send(&self, recipient_phones: &[String], message: &str) -> CapabilityResult<()>;
}

/// Handle returned by a gateway when an external payment is created.
#[derive(Debug, Clone)]
pub struct ExternalPaymentHandle {
    pub external_id: String,
    pub handler_url: Option<String>,
}

/// Payment gateway contract. Receipt and refund calls are critical-path.
pub trait PaymentProviderCapability: Send + Sync {
    /// Register the payment on the gateway side.
    fn create_external_payment(
        &self,
        payment: &Payment,
        return_url: &str,
    ) -> CapabilityResult<ExternalPaymentHandle>;

    /// Customer-facing payment page for a started payment.
    fn payment_link(&self, payment: &Payment) -> CapabilityResult<String>;

    /// How long the gateway keeps an unpaid payment alive, if bounded.
    fn duration_hours(&self) -> Option<i64>;

    /// Issue an income receipt to the fiscal provider.
    fn create_income_receipt(
        &self,
        order: &Order,
        payment: &Payment,
    ) -> CapabilityResult<PaymentReceipt>;

    /// Issue a full-refund receipt to the fiscal provider.
    fn create_refund_all_receipt(
        &self,
        order: &Order,
        payment: &Payment,
    ) -> CapabilityResult<PaymentReceipt>;

    /// Refund `amount` against the order's payment. Negative amounts reverse
    /// an earlier partial refund.
    fn refund(&self, order: &Order, amount: f64) -> CapabilityResult<()>;
}

/// Search re-indexing, best-effort.
pub trait SearchIndexCapability: Send + Sync {
    fn mark_product_for_index_via_offer(&self, offer_id: OfferId) -> CapabilityResult<()>;
}

/// Merchant configuration relevant to the shipment state machine.
#[derive(Debug, Clone, Default)]
pub struct MerchantConfig {
    pub requires_approval: bool,
}

pub trait MerchantDirectoryCapability: Send + Sync {
    fn merchant_config(&self, merchant_id: MerchantId) -> CapabilityResult<MerchantConfig>;
}

/// Marketing system notification, best-effort (failure logged, not surfaced).
pub trait MarketingNotifyCapability: Send + Sync {
    fn update_payment_status(
        &self,
        order_id: OrderId,
        payment_status: PaymentStatus,
    ) -> CapabilityResult<()>;
}

/// Pickup point details used to compose ready-for-recipient messages.
#[derive(Debug, Clone)]
pub struct PointInfo {
    pub address: String,
    pub timetable: String,
    pub phone: String,
}

pub trait PickupPointDirectoryCapability: Send + Sync {
    /// `Ok(None)` when the point is unknown; the notification is then skipped.
    fn lookup(&self, point_id: PickupPointId) -> CapabilityResult<Option<PointInfo>>;
}

/// Customer contact lookup, used to resolve SMS recipients.
pub trait CustomerDirectoryCapability: Send + Sync {
    fn customer_phone(&self, customer_id: CustomerId) -> CapabilityResult<Option<String>>;
}

/// All external collaborators, handed to the engine at startup.
#[derive(Clone)]
pub struct CapabilitySet {
    pub search: Arc<dyn SearchIndexCapability>,
    pub marketing: Arc<dyn MarketingNotifyCapability>,
    pub merchants: Arc<dyn MerchantDirectoryCapability>,
    pub sms: Arc<dyn NotificationSender>,
    pub points: Arc<dyn PickupPointDirectoryCapability>,
    pub customers: Arc<dyn CustomerDirectoryCapability>,
}
