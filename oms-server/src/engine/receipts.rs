//! Receipt and refund engine
//!
//! Runs after commit, never inside the entity transaction: fiscal-provider
//! calls are network calls and sit on the critical path. On provider failure
//! the error propagates and `is_receipt_sent` stays false, so the next
//! qualifying payment save retries the issuance.

use crate::capabilities::{CapabilitySet, PaymentProviderCapability};
use crate::error::{OmsError, OmsResult};
use crate::observers::ObserverRegistry;
use crate::store::EntityStore;
use crate::uow::{SideEffect, UnitOfWork};
use shared::models::{Order, Payment, PaymentStatus, PaymentSystem};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Strategy registry mapping a payment system to its gateway implementation.
#[derive(Default)]
pub struct PaymentProviderRegistry {
    providers: HashMap<PaymentSystem, Arc<dyn PaymentProviderCapability>>,
}

impl PaymentProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        system: PaymentSystem,
        provider: Arc<dyn PaymentProviderCapability>,
    ) {
        self.providers.insert(system, provider);
    }

    pub fn resolve(
        &self,
        system: PaymentSystem,
    ) -> OmsResult<Arc<dyn PaymentProviderCapability>> {
        self.providers
            .get(&system)
            .cloned()
            .ok_or(OmsError::ProviderNotRegistered(system))
    }
}

pub struct ReceiptEngine {
    store: EntityStore,
    observers: Arc<ObserverRegistry>,
    caps: CapabilitySet,
    providers: Arc<PaymentProviderRegistry>,
}

impl ReceiptEngine {
    pub fn new(
        store: EntityStore,
        observers: Arc<ObserverRegistry>,
        caps: CapabilitySet,
        providers: Arc<PaymentProviderRegistry>,
    ) -> Self {
        Self {
            store,
            observers,
            caps,
            providers,
        }
    }

    /// Gateway implementation for a payment system.
    pub fn provider(
        &self,
        system: PaymentSystem,
    ) -> OmsResult<Arc<dyn PaymentProviderCapability>> {
        self.providers.resolve(system)
    }

    fn begin(&self) -> OmsResult<UnitOfWork> {
        UnitOfWork::new(self.store.clone(), self.observers.clone(), self.caps.clone())
    }

    /// Whether an income receipt is due for this payment.
    pub fn income_receipt_due(payment: &Payment) -> bool {
        matches!(payment.status, PaymentStatus::Hold | PaymentStatus::Paid)
            && !payment.is_receipt_sent
    }

    /// React to a committed payment status transition. `old_status` is `None`
    /// for a freshly created payment.
    pub fn after_payment_transition(
        &self,
        payment_id: u64,
        old_status: Option<PaymentStatus>,
    ) -> OmsResult<Vec<SideEffect>> {
        let payment = self
            .store
            .load_payment(payment_id)?
            .ok_or(OmsError::PaymentNotFound(payment_id))?;
        if old_status == Some(payment.status) {
            return Ok(Vec::new());
        }
        let order = self
            .store
            .load_order(payment.order_id)?
            .ok_or(OmsError::OrderNotFound(payment.order_id))?;

        if Self::income_receipt_due(&payment) {
            return self.issue_income_receipt(&order, payment);
        }
        if payment.status == PaymentStatus::Timeout {
            return self.issue_refund_all_receipt(&order, &payment);
        }
        Ok(Vec::new())
    }

    /// Issue an income receipt and, only on success, latch `is_receipt_sent`.
    fn issue_income_receipt(
        &self,
        order: &Order,
        mut payment: Payment,
    ) -> OmsResult<Vec<SideEffect>> {
        let provider = self.providers.resolve(payment.payment_system)?;
        let receipt = provider.create_income_receipt(order, &payment)?;
        info!(payment_id = payment.id, order_id = order.id, "income receipt issued");

        let mut uow = self.begin()?;
        uow.save_receipt(receipt)?;
        payment.is_receipt_sent = true;
        uow.save_payment(payment)?;
        uow.commit()
    }

    /// Issue a full-refund receipt for a timed-out payment. The caller
    /// guarantees the status actually changed, so this fires once per
    /// transition.
    fn issue_refund_all_receipt(
        &self,
        order: &Order,
        payment: &Payment,
    ) -> OmsResult<Vec<SideEffect>> {
        let provider = self.providers.resolve(payment.payment_system)?;
        let receipt = provider.create_refund_all_receipt(order, payment)?;
        info!(payment_id = payment.id, order_id = order.id, "refund receipt issued");

        let mut uow = self.begin()?;
        uow.save_receipt(receipt)?;
        uow.commit()
    }

    /// Refund `amount` against the order's payment. Negative amounts reverse
    /// part of an earlier refund.
    pub fn refund(&self, order: &Order, amount: f64) -> OmsResult<()> {
        let payment = self.settled_payment(order.id)?;
        let provider = self.providers.resolve(payment.payment_system)?;
        provider.refund(order, amount)?;
        info!(order_id = order.id, amount, "refund requested");
        Ok(())
    }

    /// The payment refunds are issued against: the settled one if present,
    /// otherwise the held one, otherwise the first.
    fn settled_payment(&self, order_id: u64) -> OmsResult<Payment> {
        let payments = self.store.load_payments_for_order(order_id)?;
        payments
            .iter()
            .find(|p| p.status == PaymentStatus::Paid)
            .or_else(|| payments.iter().find(|p| p.status == PaymentStatus::Hold))
            .or_else(|| payments.first())
            .cloned()
            .ok_or_else(|| {
                OmsError::InvalidOperation(format!("order {order_id} has no payments to refund"))
            })
    }
}
