//! Credit payment subsystem
//!
//! Orders financed by an external credit line carry a `credit_system`
//! selector; the registry maps it to a provider implementation. Adding a
//! provider means registering it here, callers never change.

use crate::capabilities::CapabilityResult;
use crate::error::{OmsError, OmsResult};
use shared::models::{
    CreditSystem, Order, Payment, PaymentMethod, PaymentSystem, ReceiptType,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Status of a credit order on the provider side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditOrderStatus {
    pub status: String,
}

pub trait CreditProviderCapability: Send + Sync {
    /// `Ok(None)` when the provider does not know the order.
    fn check_credit_order(&self, order_number: &str) -> CapabilityResult<Option<CreditOrderStatus>>;

    /// Create a credit-financed payment for the order. `Ok(None)` when the
    /// provider declines.
    fn create_credit_payment(
        &self,
        order: &Order,
        receipt_type: ReceiptType,
    ) -> CapabilityResult<Option<Payment>>;
}

/// Strategy registry keyed by the order's credit system selector.
#[derive(Default)]
pub struct CreditRegistry {
    providers: HashMap<CreditSystem, Arc<dyn CreditProviderCapability>>,
}

impl CreditRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, system: CreditSystem, provider: Arc<dyn CreditProviderCapability>) {
        self.providers.insert(system, provider);
    }

    pub fn resolve(&self, system: CreditSystem) -> OmsResult<Arc<dyn CreditProviderCapability>> {
        self.providers
            .get(&system)
            .cloned()
            .ok_or(OmsError::CreditProviderNotRegistered(system))
    }
}

/// Transport seam for the credit-line gateway, implemented by the host over
/// the vendor SDK.
pub trait CreditLineApi: Send + Sync {
    fn order_status(&self, order_number: &str) -> CapabilityResult<Option<String>>;

    /// Returns the external payment id, or `None` when declined.
    fn create_payment(
        &self,
        order_number: &str,
        amount: f64,
        receipt_type: &str,
    ) -> CapabilityResult<Option<String>>;
}

/// Credit-line provider over the transport seam.
pub struct CreditLineProvider<A> {
    api: A,
}

impl<A: CreditLineApi> CreditLineProvider<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }
}

impl<A: CreditLineApi> CreditProviderCapability for CreditLineProvider<A> {
    fn check_credit_order(&self, order_number: &str) -> CapabilityResult<Option<CreditOrderStatus>> {
        Ok(self
            .api
            .order_status(order_number)?
            .map(|status| CreditOrderStatus { status }))
    }

    fn create_credit_payment(
        &self,
        order: &Order,
        receipt_type: ReceiptType,
    ) -> CapabilityResult<Option<Payment>> {
        let kind = match receipt_type {
            ReceiptType::Income => "income",
            ReceiptType::Refund => "refund",
        };
        let Some(external_id) = self.api.create_payment(&order.number, order.price, kind)? else {
            return Ok(None);
        };
        let mut payment = Payment::new(order.id, PaymentSystem::CreditLine, order.price);
        payment.payment_method = PaymentMethod::Postpay;
        payment.data.external_id = Some(external_id);
        Ok(Some(payment))
    }
}
