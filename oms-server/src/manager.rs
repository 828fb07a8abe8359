//! Order management facade
//!
//! `OmsManager` is the call surface boundary layers use: every public method
//! is one transaction boundary. The pattern throughout is
//!
//! 1. open a unit of work, mutate entities (observers cascade inside),
//! 2. commit,
//! 3. run queued best-effort effects,
//! 4. run critical-path provider calls (receipts, refunds, payment start),
//!    whose failures propagate to the caller.

use crate::capabilities::CapabilitySet;
use crate::credit::{CreditOrderStatus, CreditRegistry};
use crate::engine::receipts::{PaymentProviderRegistry, ReceiptEngine};
use crate::engine::shipments;
use crate::error::{OmsError, OmsResult};
use crate::money;
use crate::notify::NotificationService;
use crate::observers::ObserverRegistry;
use crate::store::EntityStore;
use crate::uow::{SideEffect, UnitOfWork};
use chrono::{Duration, Utc};
use shared::models::{
    Basket, BasketItem, BasketType, Delivery, HistoryRecord, Order, OrderComment, OrderReturn,
    OrderReturnItem, Payment, PaymentReceipt, PaymentStatus, PaymentSystem, ReceiptType, Shipment,
    ShipmentItem, ShipmentPackage, ShipmentPackageItem,
};
use std::sync::Arc;
use tracing::{info, warn};

pub struct OmsManager {
    store: EntityStore,
    registry: Arc<ObserverRegistry>,
    caps: CapabilitySet,
    credit: CreditRegistry,
    receipts: ReceiptEngine,
    notify: NotificationService,
}

impl OmsManager {
    pub fn new(
        store: EntityStore,
        registry: ObserverRegistry,
        caps: CapabilitySet,
        providers: PaymentProviderRegistry,
        credit: CreditRegistry,
    ) -> Self {
        let registry = Arc::new(registry);
        let providers = Arc::new(providers);
        let receipts = ReceiptEngine::new(
            store.clone(),
            registry.clone(),
            caps.clone(),
            providers.clone(),
        );
        let notify = NotificationService::new(store.clone(), caps.clone());
        Self {
            store,
            registry,
            caps,
            credit,
            receipts,
            notify,
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    fn begin(&self) -> OmsResult<UnitOfWork> {
        UnitOfWork::new(self.store.clone(), self.registry.clone(), self.caps.clone())
    }

    /// Run queued effects, best-effort. Duplicates collapse; failures are
    /// logged and swallowed.
    fn run_effects(&self, effects: Vec<SideEffect>) {
        let mut seen: Vec<SideEffect> = Vec::new();
        for effect in effects {
            if seen.contains(&effect) {
                continue;
            }
            match &effect {
                SideEffect::ReindexOffer { offer_id } => {
                    if let Err(err) = self.caps.search.mark_product_for_index_via_offer(*offer_id) {
                        warn!(offer_id, %err, "search re-index request failed");
                    }
                }
                SideEffect::MarketingPaymentStatus {
                    order_id,
                    payment_status,
                } => {
                    if let Err(err) = self
                        .caps
                        .marketing
                        .update_payment_status(*order_id, *payment_status)
                    {
                        warn!(order_id, %err, "marketing payment-status notification failed");
                    }
                }
                SideEffect::OrderPaid { order_id } => match self.store.load_order(*order_id) {
                    Ok(Some(order)) => self.notify.payed(&order),
                    Ok(None) => warn!(order_id, "order gone, paid notification skipped"),
                    Err(err) => warn!(order_id, %err, "order load failed, paid notification skipped"),
                },
            }
            seen.push(effect);
        }
    }

    // ========== Baskets ==========

    pub fn create_basket(&self, customer_id: u64, basket_type: BasketType) -> OmsResult<Basket> {
        let mut uow = self.begin()?;
        let basket = uow.save_basket(Basket::new(customer_id, basket_type))?;
        self.run_effects(uow.commit()?);
        Ok(basket)
    }

    pub fn basket(&self, basket_id: u64) -> OmsResult<Basket> {
        self.store
            .load_basket(basket_id)?
            .ok_or(OmsError::BasketNotFound(basket_id))
    }

    pub fn basket_items(&self, basket_id: u64) -> OmsResult<Vec<BasketItem>> {
        Ok(self.store.load_items_for_basket(basket_id)?)
    }

    /// Delete a basket that has not been claimed by an order; claimed baskets
    /// only go away with their order.
    pub fn delete_basket(&self, basket_id: u64) -> OmsResult<()> {
        let basket = self.basket(basket_id)?;
        if basket.belongs_to_order {
            return Err(OmsError::InvalidOperation(format!(
                "basket {basket_id} belongs to an order, delete the order instead"
            )));
        }
        let mut uow = self.begin()?;
        uow.delete_basket(basket_id)?;
        self.run_effects(uow.commit()?);
        Ok(())
    }

    pub fn save_basket_item(&self, item: BasketItem) -> OmsResult<BasketItem> {
        if !money::is_valid_amount(item.qty) || item.qty < 0.0 {
            return Err(OmsError::InvalidOperation(format!(
                "invalid quantity {} for basket item",
                item.qty
            )));
        }
        if let Some(price) = item.price {
            if !money::is_valid_price(price) {
                return Err(OmsError::InvalidOperation(format!(
                    "invalid price {price} for basket item"
                )));
            }
        }
        self.basket(item.basket_id)?;
        let mut uow = self.begin()?;
        let item = uow.save_basket_item(item)?;
        self.run_effects(uow.commit()?);
        Ok(item)
    }

    pub fn delete_basket_item(&self, item_id: u64) -> OmsResult<()> {
        let mut uow = self.begin()?;
        uow.delete_basket_item(item_id)?;
        self.run_effects(uow.commit()?);
        Ok(())
    }

    // ========== Orders ==========

    /// Create an order from a basket. The order price is derived from the
    /// basket's current items; the basket is claimed in the same transaction.
    pub fn create_order(&self, basket_id: u64, number: impl Into<String>) -> OmsResult<Order> {
        let basket = self.basket(basket_id)?;
        if basket.belongs_to_order {
            return Err(OmsError::BasketAlreadyOrdered(basket_id));
        }
        let items = self.store.load_items_for_basket(basket_id)?;
        let price = money::sum(
            items
                .iter()
                .map(|i| money::line_cost(i.qty, i.price.unwrap_or(0.0))),
        );
        let order = Order::new(
            basket_id,
            basket.customer_id,
            number,
            basket.basket_type,
            price,
        );
        let mut uow = self.begin()?;
        let order = uow.save_order(order)?;
        self.run_effects(uow.commit()?);
        info!(order_id = order.id, basket_id, "order created");
        Ok(order)
    }

    pub fn order(&self, order_id: u64) -> OmsResult<Order> {
        self.store
            .load_order(order_id)?
            .ok_or(OmsError::OrderNotFound(order_id))
    }

    /// Update an existing order. Timestamp stamping and audit recording
    /// happen in the observer chain.
    pub fn save_order(&self, order: Order) -> OmsResult<Order> {
        if order.id == 0 {
            return Err(OmsError::InvalidOperation(
                "orders are created from baskets, not saved directly".into(),
            ));
        }
        self.order(order.id)?;
        let mut uow = self.begin()?;
        let order = uow.save_order(order)?;
        self.run_effects(uow.commit()?);
        Ok(order)
    }

    /// Delete an order and everything it owns in one transaction.
    pub fn delete_order(&self, order_id: u64) -> OmsResult<()> {
        let mut uow = self.begin()?;
        uow.delete_order(order_id)?;
        self.run_effects(uow.commit()?);
        info!(order_id, "order deleted");
        Ok(())
    }

    pub fn order_history(&self, order_id: u64) -> OmsResult<Vec<HistoryRecord>> {
        Ok(self.store.load_history_for_order(order_id)?)
    }

    pub fn add_comment(&self, order_id: u64, text: impl Into<String>) -> OmsResult<OrderComment> {
        self.order(order_id)?;
        let mut uow = self.begin()?;
        let comment = uow.save_comment(OrderComment::new(order_id, text))?;
        self.run_effects(uow.commit()?);
        Ok(comment)
    }

    // ========== Deliveries and shipments ==========

    pub fn create_delivery(&self, delivery: Delivery) -> OmsResult<Delivery> {
        self.order(delivery.order_id)?;
        let mut uow = self.begin()?;
        let delivery = uow.save_delivery(delivery)?;
        self.run_effects(uow.commit()?);
        Ok(delivery)
    }

    pub fn delivery(&self, delivery_id: u64) -> OmsResult<Delivery> {
        self.store
            .load_delivery(delivery_id)?
            .ok_or(OmsError::DeliveryNotFound(delivery_id))
    }

    pub fn delete_delivery(&self, delivery_id: u64) -> OmsResult<()> {
        let mut uow = self.begin()?;
        uow.delete_delivery(delivery_id)?;
        self.run_effects(uow.commit()?);
        Ok(())
    }

    pub fn create_shipment(&self, shipment: Shipment) -> OmsResult<Shipment> {
        self.delivery(shipment.delivery_id)?;
        let mut uow = self.begin()?;
        let shipment = uow.save_shipment(shipment)?;
        self.run_effects(uow.commit()?);
        Ok(shipment)
    }

    pub fn shipment(&self, shipment_id: u64) -> OmsResult<Shipment> {
        self.store
            .load_shipment(shipment_id)?
            .ok_or(OmsError::ShipmentNotFound(shipment_id))
    }

    /// Save a shipment; the approval correction may settle it into
    /// `Checking` before this returns.
    pub fn save_shipment(&self, shipment: Shipment) -> OmsResult<Shipment> {
        if shipment.id == 0 {
            return Err(OmsError::InvalidOperation(
                "use create_shipment for new shipments".into(),
            ));
        }
        self.shipment(shipment.id)?;
        let mut uow = self.begin()?;
        let shipment = uow.save_shipment(shipment)?;
        self.run_effects(uow.commit()?);
        Ok(shipment)
    }

    pub fn delete_shipment(&self, shipment_id: u64) -> OmsResult<()> {
        let mut uow = self.begin()?;
        uow.delete_shipment(shipment_id)?;
        self.run_effects(uow.commit()?);
        Ok(())
    }

    /// Re-evaluate a shipment's approval state, used by the periodic
    /// delivery-status driver.
    pub fn recheck_shipment(&self, shipment_id: u64) -> OmsResult<Shipment> {
        let shipment = self.shipment(shipment_id)?;
        self.save_shipment(shipment)
    }

    /// Link a basket item into a shipment and refresh the shipment totals.
    pub fn add_shipment_item(
        &self,
        shipment_id: u64,
        basket_item_id: u64,
    ) -> OmsResult<ShipmentItem> {
        self.shipment(shipment_id)?;
        self.store
            .load_basket_item(basket_item_id)?
            .ok_or(OmsError::BasketItemNotFound(basket_item_id))?;
        let mut uow = self.begin()?;
        let item = uow.save_shipment_item(ShipmentItem {
            id: 0,
            shipment_id,
            basket_item_id,
        })?;
        shipments::recalc(&mut uow, shipment_id)?;
        shipments::cost_recalc(&mut uow, shipment_id)?;
        self.run_effects(uow.commit()?);
        Ok(item)
    }

    pub fn add_package(&self, shipment_id: u64, weight: Option<f64>) -> OmsResult<ShipmentPackage> {
        self.shipment(shipment_id)?;
        let mut uow = self.begin()?;
        let package = uow.save_package(ShipmentPackage {
            id: 0,
            shipment_id,
            weight,
        })?;
        self.run_effects(uow.commit()?);
        Ok(package)
    }

    pub fn add_package_item(
        &self,
        package_id: u64,
        basket_item_id: u64,
        qty: f64,
    ) -> OmsResult<ShipmentPackageItem> {
        self.store
            .load_basket_item(basket_item_id)?
            .ok_or(OmsError::BasketItemNotFound(basket_item_id))?;
        let mut uow = self.begin()?;
        let item = uow.save_package_item(ShipmentPackageItem {
            id: 0,
            package_id,
            basket_item_id,
            qty,
        })?;
        self.run_effects(uow.commit()?);
        Ok(item)
    }

    // ========== Payments ==========

    pub fn create_payment(
        &self,
        order_id: u64,
        payment_system: PaymentSystem,
        sum: Option<f64>,
    ) -> OmsResult<Payment> {
        let order = self.order(order_id)?;
        let sum = sum.unwrap_or(order.price);
        if !money::is_valid_price(sum) {
            return Err(OmsError::InvalidOperation(format!(
                "invalid payment sum {sum}"
            )));
        }
        let mut uow = self.begin()?;
        let payment = uow.save_payment(Payment::new(order_id, payment_system, sum))?;
        self.run_effects(uow.commit()?);
        Ok(payment)
    }

    pub fn payment(&self, payment_id: u64) -> OmsResult<Payment> {
        self.store
            .load_payment(payment_id)?
            .ok_or(OmsError::PaymentNotFound(payment_id))
    }

    pub fn receipts_for_payment(&self, payment_id: u64) -> OmsResult<Vec<PaymentReceipt>> {
        Ok(self.store.load_receipts_for_payment(payment_id)?)
    }

    /// Update a receipt, typically from a fiscal-provider status callback.
    /// Guid assignment and `payed_at` stamping happen in the observer chain.
    pub fn save_receipt(&self, receipt: PaymentReceipt) -> OmsResult<PaymentReceipt> {
        let mut uow = self.begin()?;
        let receipt = uow.save_receipt(receipt)?;
        self.run_effects(uow.commit()?);
        Ok(receipt)
    }

    /// Save a payment, then react to its committed status transition:
    /// refresh effects run best-effort, receipt issuance runs critical-path
    /// and propagates provider failures so the caller can retry.
    pub fn save_payment(&self, payment: Payment) -> OmsResult<Payment> {
        let old_status = self.payment(payment.id)?.status;
        let payment_id = payment.id;
        let mut uow = self.begin()?;
        uow.save_payment(payment)?;
        self.run_effects(uow.commit()?);
        let effects = self
            .receipts
            .after_payment_transition(payment_id, Some(old_status))?;
        self.run_effects(effects);
        self.payment(payment_id)
    }

    pub fn delete_payment(&self, payment_id: u64) -> OmsResult<()> {
        let mut uow = self.begin()?;
        uow.delete_payment(payment_id)?;
        self.run_effects(uow.commit()?);
        Ok(())
    }

    /// Register the payment with its gateway. Re-starting a payment that
    /// already has an external id (or has left `NotPaid`) is an error.
    pub fn start_payment(&self, payment_id: u64, return_url: &str) -> OmsResult<Payment> {
        let mut payment = self.payment(payment_id)?;
        if payment.data.external_id.is_some() || payment.status != PaymentStatus::NotPaid {
            return Err(OmsError::PaymentAlreadyStarted(payment_id));
        }
        let provider = self.receipts.provider(payment.payment_system)?;
        let handle = provider.create_external_payment(&payment, return_url)?;
        payment.data.external_id = Some(handle.external_id);
        payment.data.handler_url = handle.handler_url;
        payment.data.return_url = Some(return_url.to_string());
        if let Some(hours) = provider.duration_hours() {
            payment.expires_at = Some(Utc::now() + Duration::hours(hours));
        }
        let mut uow = self.begin()?;
        let payment = uow.save_payment(payment)?;
        self.run_effects(uow.commit()?);
        info!(payment_id, "payment started");
        Ok(payment)
    }

    pub fn payment_link(&self, payment_id: u64) -> OmsResult<String> {
        let payment = self.payment(payment_id)?;
        let provider = self.receipts.provider(payment.payment_system)?;
        Ok(provider.payment_link(&payment)?)
    }

    /// Expire an unpaid payment. Payments that have left `NotPaid` are left
    /// alone; the periodic driver may race a customer finishing checkout.
    pub fn timeout_payment(&self, payment_id: u64) -> OmsResult<()> {
        let mut payment = self.payment(payment_id)?;
        if payment.status != PaymentStatus::NotPaid {
            info!(payment_id, status = ?payment.status, "timeout skipped, payment no longer open");
            return Ok(());
        }
        payment.status = PaymentStatus::Timeout;
        let mut uow = self.begin()?;
        uow.save_payment(payment)?;
        self.run_effects(uow.commit()?);
        let effects = self
            .receipts
            .after_payment_transition(payment_id, Some(PaymentStatus::NotPaid))?;
        self.run_effects(effects);
        Ok(())
    }

    // ========== Returns ==========

    /// File a return claim. The full claimed price is refunded through the
    /// order's payment provider after the claim is committed.
    pub fn create_return(&self, order_id: u64, price: f64) -> OmsResult<OrderReturn> {
        if !money::is_valid_price(price) {
            return Err(OmsError::InvalidOperation(format!(
                "invalid return price {price}"
            )));
        }
        let order = self.order(order_id)?;
        let mut uow = self.begin()?;
        let ret = uow.save_return(OrderReturn::new(order_id, price))?;
        self.run_effects(uow.commit()?);
        self.receipts.refund(&order, price)?;
        Ok(ret)
    }

    pub fn order_return(&self, return_id: u64) -> OmsResult<OrderReturn> {
        self.store
            .load_return(return_id)?
            .ok_or(OmsError::ReturnNotFound(return_id))
    }

    /// Update a return claim. A price change refunds the delta — negative
    /// when the claim was lowered, reversing part of the earlier refund.
    pub fn save_return(&self, ret: OrderReturn) -> OmsResult<OrderReturn> {
        let old = self.order_return(ret.id)?;
        let order = self.order(ret.order_id)?;
        let delta = money::diff(ret.price, old.price);
        let mut uow = self.begin()?;
        let ret = uow.save_return(ret)?;
        self.run_effects(uow.commit()?);
        if delta != 0.0 {
            self.receipts.refund(&order, delta)?;
        }
        Ok(ret)
    }

    pub fn add_return_item(
        &self,
        return_id: u64,
        basket_item_id: u64,
        qty: f64,
        price: f64,
    ) -> OmsResult<OrderReturnItem> {
        self.order_return(return_id)?;
        let mut uow = self.begin()?;
        let item = uow.save_return_item(OrderReturnItem {
            id: 0,
            return_id,
            basket_item_id,
            qty,
            price,
        })?;
        self.run_effects(uow.commit()?);
        Ok(item)
    }

    pub fn delete_return(&self, return_id: u64) -> OmsResult<()> {
        let mut uow = self.begin()?;
        uow.delete_return(return_id)?;
        self.run_effects(uow.commit()?);
        Ok(())
    }

    // ========== Credit ==========

    pub fn check_credit_order(&self, order_id: u64) -> OmsResult<Option<CreditOrderStatus>> {
        let order = self.order(order_id)?;
        let system = order
            .credit_system
            .ok_or(OmsError::NoCreditSystem(order_id))?;
        let provider = self.credit.resolve(system)?;
        Ok(provider.check_credit_order(&order.number)?)
    }

    /// Ask the order's credit provider to finance it; a granted payment is
    /// persisted like any other.
    pub fn create_credit_payment(
        &self,
        order_id: u64,
        receipt_type: ReceiptType,
    ) -> OmsResult<Option<Payment>> {
        let order = self.order(order_id)?;
        let system = order
            .credit_system
            .ok_or(OmsError::NoCreditSystem(order_id))?;
        let provider = self.credit.resolve(system)?;
        let Some(payment) = provider.create_credit_payment(&order, receipt_type)? else {
            return Ok(None);
        };
        let mut uow = self.begin()?;
        let payment = uow.save_payment(payment)?;
        self.run_effects(uow.commit()?);
        Ok(Some(payment))
    }

    // ========== Notifications ==========

    pub fn notify_delivery_shipped(&self, delivery_id: u64) -> OmsResult<()> {
        let delivery = self.delivery(delivery_id)?;
        self.notify.delivery_shipped(&delivery);
        Ok(())
    }

    pub fn notify_delivery_ready(&self, delivery_id: u64) -> OmsResult<()> {
        let delivery = self.delivery(delivery_id)?;
        self.notify.delivery_ready_for_recipient(&delivery);
        Ok(())
    }
}
