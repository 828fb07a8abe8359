//! Unit of work
//!
//! One `UnitOfWork` wraps one redb write transaction and carries everything a
//! cascade needs: the store, the observer registry, the capability set, and a
//! queue of side effects. Entity saves and deletes go through the `save_*` /
//! `delete_*` methods here, which dispatch the registered observers around the
//! physical write. Observers receive `&mut UnitOfWork` and may save or delete
//! further entities, so a single outer operation fans out into a full cascade
//! inside one transaction.
//!
//! External calls never happen inside the transaction. Best-effort effects
//! (re-indexing, marketing, SMS) are queued as `SideEffect` values and handed
//! to the caller by `commit`; the manager runs them after the data is durable.

use crate::capabilities::CapabilitySet;
use crate::engine;
use crate::error::{OmsError, OmsResult};
use crate::observers::ObserverRegistry;
use crate::store::{EntityStore, StoreError};
use chrono::Utc;
use redb::WriteTransaction;
use shared::models::{
    Basket, BasketItem, Delivery, HistoryEntity, HistoryRecord, HistoryType, OfferId, Order,
    OrderComment, OrderId, OrderReturn, OrderReturnItem, Payment, PaymentReceipt, PaymentStatus,
    Shipment, ShipmentItem, ShipmentPackage, ShipmentPackageItem,
};
use std::sync::Arc;

/// Deferred external action, executed best-effort after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Ask the search index to re-index the product behind an offer.
    ReindexOffer { offer_id: OfferId },
    /// Tell the marketing system a certificate order's payment status moved.
    MarketingPaymentStatus {
        order_id: OrderId,
        payment_status: PaymentStatus,
    },
    /// Send the "order paid" SMS.
    OrderPaid { order_id: OrderId },
}

pub struct UnitOfWork {
    store: EntityStore,
    txn: WriteTransaction,
    registry: Arc<ObserverRegistry>,
    caps: CapabilitySet,
    effects: Vec<SideEffect>,
}

impl UnitOfWork {
    pub fn new(
        store: EntityStore,
        registry: Arc<ObserverRegistry>,
        caps: CapabilitySet,
    ) -> OmsResult<Self> {
        let txn = store.begin_write()?;
        Ok(Self {
            store,
            txn,
            registry,
            caps,
            effects: Vec::new(),
        })
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn txn(&self) -> &WriteTransaction {
        &self.txn
    }

    pub fn caps(&self) -> &CapabilitySet {
        &self.caps
    }

    /// Queue a best-effort effect for after commit.
    pub fn effect(&mut self, effect: SideEffect) {
        self.effects.push(effect);
    }

    /// Commit the transaction and hand the queued effects to the caller.
    /// Dropping an uncommitted unit of work discards every change it made.
    pub fn commit(self) -> OmsResult<Vec<SideEffect>> {
        self.txn.commit().map_err(StoreError::from)?;
        Ok(self.effects)
    }

    pub fn next_id(&self) -> OmsResult<u64> {
        Ok(self.store.next_id(&self.txn)?)
    }

    /// Append an audit record for an order.
    pub fn record_history(
        &mut self,
        order_id: OrderId,
        history_type: HistoryType,
        entity: HistoryEntity,
        entity_id: u64,
        payload: serde_json::Value,
    ) -> OmsResult<()> {
        let seq = self.store.next_history_seq(&self.txn)?;
        let record = HistoryRecord {
            seq,
            order_id,
            history_type,
            entity,
            entity_id,
            payload,
            created_at: Utc::now(),
        };
        self.store.append_history(&self.txn, &record)?;
        Ok(())
    }

    /// Recompute and persist the order's aggregate payment status. A missing
    /// order is an error: a payment must never silently fail to update its
    /// order.
    pub fn refresh_payment_status(&mut self, order_id: OrderId) -> OmsResult<()> {
        let order = self
            .store
            .get_order(&self.txn, order_id)?
            .ok_or(OmsError::OrderNotFound(order_id))?;
        let payments = self.store.payments_for_order(&self.txn, order_id)?;
        let aggregate = engine::payment_status::aggregate(&payments);
        if aggregate != order.payment_status {
            let mut updated = order;
            updated.payment_status = aggregate;
            self.save_order(updated)?;
        }
        Ok(())
    }

    /// Write a shipment row directly, bypassing observer dispatch. This is the
    /// settle-then-stop path for the approval correction: the corrected row
    /// must not re-enter the update hook.
    pub fn persist_shipment_unobserved(&mut self, shipment: &Shipment) -> OmsResult<()> {
        Ok(self.store.put_shipment(&self.txn, shipment)?)
    }

    // ========== Baskets ==========

    pub fn save_basket(&mut self, mut basket: Basket) -> OmsResult<Basket> {
        let old = if basket.id == 0 {
            None
        } else {
            self.store.get_basket(&self.txn, basket.id)?
        };
        if basket.id == 0 {
            basket.id = self.store.next_id(&self.txn)?;
        }
        let registry = self.registry.clone();
        for obs in &registry.baskets {
            obs.saving(self, &mut basket, old.as_ref())?;
        }
        self.store.put_basket(&self.txn, &basket)?;
        match &old {
            None => {
                for obs in &registry.baskets {
                    obs.created(self, &basket)?;
                }
            }
            Some(prev) => {
                for obs in &registry.baskets {
                    obs.updated(self, &basket, prev)?;
                }
            }
        }
        Ok(basket)
    }

    pub fn delete_basket(&mut self, basket_id: u64) -> OmsResult<()> {
        let basket = self
            .store
            .get_basket(&self.txn, basket_id)?
            .ok_or(OmsError::BasketNotFound(basket_id))?;
        let registry = self.registry.clone();
        for obs in &registry.baskets {
            obs.deleting(self, &basket)?;
        }
        self.store.remove_basket(&self.txn, &basket)?;
        Ok(())
    }

    // ========== Basket items ==========

    pub fn save_basket_item(&mut self, mut item: BasketItem) -> OmsResult<BasketItem> {
        let old = if item.id == 0 {
            None
        } else {
            self.store.get_basket_item(&self.txn, item.id)?
        };
        if item.id == 0 {
            item.id = self.store.next_id(&self.txn)?;
        }
        let registry = self.registry.clone();
        for obs in &registry.basket_items {
            obs.saving(self, &mut item, old.as_ref())?;
        }
        self.store.put_basket_item(&self.txn, &item)?;
        match &old {
            None => {
                for obs in &registry.basket_items {
                    obs.created(self, &item)?;
                }
            }
            Some(prev) => {
                for obs in &registry.basket_items {
                    obs.updated(self, &item, prev)?;
                }
            }
        }
        Ok(item)
    }

    pub fn delete_basket_item(&mut self, item_id: u64) -> OmsResult<()> {
        let item = self
            .store
            .get_basket_item(&self.txn, item_id)?
            .ok_or(OmsError::BasketItemNotFound(item_id))?;
        let registry = self.registry.clone();
        for obs in &registry.basket_items {
            obs.deleting(self, &item)?;
        }
        self.store.remove_basket_item(&self.txn, &item)?;
        Ok(())
    }

    // ========== Orders ==========

    pub fn save_order(&mut self, mut order: Order) -> OmsResult<Order> {
        let old = if order.id == 0 {
            None
        } else {
            self.store.get_order(&self.txn, order.id)?
        };
        if order.id == 0 {
            order.id = self.store.next_id(&self.txn)?;
        }
        let registry = self.registry.clone();
        for obs in &registry.orders {
            obs.saving(self, &mut order, old.as_ref())?;
        }
        self.store.put_order(&self.txn, &order)?;
        match &old {
            None => {
                for obs in &registry.orders {
                    obs.created(self, &order)?;
                }
            }
            Some(prev) => {
                for obs in &registry.orders {
                    obs.updated(self, &order, prev)?;
                }
            }
        }
        Ok(order)
    }

    pub fn delete_order(&mut self, order_id: u64) -> OmsResult<()> {
        let order = self
            .store
            .get_order(&self.txn, order_id)?
            .ok_or(OmsError::OrderNotFound(order_id))?;
        let registry = self.registry.clone();
        for obs in &registry.orders {
            obs.deleting(self, &order)?;
        }
        self.store.remove_order(&self.txn, &order)?;
        Ok(())
    }

    // ========== Payments ==========

    pub fn save_payment(&mut self, mut payment: Payment) -> OmsResult<Payment> {
        let old = if payment.id == 0 {
            None
        } else {
            self.store.get_payment(&self.txn, payment.id)?
        };
        if payment.id == 0 {
            payment.id = self.store.next_id(&self.txn)?;
        }
        let registry = self.registry.clone();
        for obs in &registry.payments {
            obs.saving(self, &mut payment, old.as_ref())?;
        }
        self.store.put_payment(&self.txn, &payment)?;
        match &old {
            None => {
                for obs in &registry.payments {
                    obs.created(self, &payment)?;
                }
            }
            Some(prev) => {
                for obs in &registry.payments {
                    obs.updated(self, &payment, prev)?;
                }
            }
        }
        Ok(payment)
    }

    pub fn delete_payment(&mut self, payment_id: u64) -> OmsResult<()> {
        let payment = self
            .store
            .get_payment(&self.txn, payment_id)?
            .ok_or(OmsError::PaymentNotFound(payment_id))?;
        let registry = self.registry.clone();
        for obs in &registry.payments {
            obs.deleting(self, &payment)?;
        }
        self.remove_payment_with_receipts(&payment)?;
        self.refresh_payment_status(payment.order_id)?;
        Ok(())
    }

    /// Remove a payment row together with its receipts, no dispatch. Used by
    /// the order-delete cascade where the order row is going away too.
    pub(crate) fn remove_payment_with_receipts(&mut self, payment: &Payment) -> OmsResult<()> {
        for receipt in self.store.receipts_for_payment(&self.txn, payment.id)? {
            self.store.remove_receipt(&self.txn, &receipt)?;
        }
        self.store.remove_payment(&self.txn, payment)?;
        Ok(())
    }

    // ========== Receipts ==========

    pub fn save_receipt(&mut self, mut receipt: PaymentReceipt) -> OmsResult<PaymentReceipt> {
        let old = if receipt.id == 0 {
            None
        } else {
            self.store.get_receipt(&self.txn, receipt.id)?
        };
        if receipt.id == 0 {
            receipt.id = self.store.next_id(&self.txn)?;
        }
        let registry = self.registry.clone();
        for obs in &registry.receipts {
            obs.saving(self, &mut receipt, old.as_ref())?;
        }
        self.store.put_receipt(&self.txn, &receipt)?;
        match &old {
            None => {
                for obs in &registry.receipts {
                    obs.created(self, &receipt)?;
                }
            }
            Some(prev) => {
                for obs in &registry.receipts {
                    obs.updated(self, &receipt, prev)?;
                }
            }
        }
        Ok(receipt)
    }

    // ========== Deliveries ==========

    pub fn save_delivery(&mut self, mut delivery: Delivery) -> OmsResult<Delivery> {
        if delivery.id == 0 {
            delivery.id = self.store.next_id(&self.txn)?;
        } else if let Some(old) = self.store.get_delivery(&self.txn, delivery.id)? {
            if delivery.order_id != old.order_id {
                return Err(OmsError::InvalidOperation(format!(
                    "delivery {} cannot move from order {} to order {}",
                    delivery.id, old.order_id, delivery.order_id
                )));
            }
        }
        self.store.put_delivery(&self.txn, &delivery)?;
        Ok(delivery)
    }

    /// Delete a delivery and cascade into its shipments.
    pub fn delete_delivery(&mut self, delivery_id: u64) -> OmsResult<()> {
        let delivery = self
            .store
            .get_delivery(&self.txn, delivery_id)?
            .ok_or(OmsError::DeliveryNotFound(delivery_id))?;
        for shipment in self.store.shipments_for_delivery(&self.txn, delivery_id)? {
            self.delete_shipment(shipment.id)?;
        }
        self.store.remove_delivery(&self.txn, &delivery)?;
        Ok(())
    }

    // ========== Shipments ==========

    pub fn save_shipment(&mut self, mut shipment: Shipment) -> OmsResult<Shipment> {
        let old = if shipment.id == 0 {
            None
        } else {
            self.store.get_shipment(&self.txn, shipment.id)?
        };
        if shipment.id == 0 {
            shipment.id = self.store.next_id(&self.txn)?;
        }
        let registry = self.registry.clone();
        for obs in &registry.shipments {
            obs.saving(self, &mut shipment, old.as_ref())?;
        }
        self.store.put_shipment(&self.txn, &shipment)?;
        match &old {
            None => {
                for obs in &registry.shipments {
                    obs.created(self, &shipment)?;
                }
            }
            Some(prev) => {
                for obs in &registry.shipments {
                    obs.updated(self, &shipment, prev)?;
                }
            }
        }
        // The correction pass may have rewritten the row underneath us.
        Ok(self
            .store
            .get_shipment(&self.txn, shipment.id)?
            .unwrap_or(shipment))
    }

    /// Delete a shipment and cascade into its items and packages.
    pub fn delete_shipment(&mut self, shipment_id: u64) -> OmsResult<()> {
        let shipment = self
            .store
            .get_shipment(&self.txn, shipment_id)?
            .ok_or(OmsError::ShipmentNotFound(shipment_id))?;
        let registry = self.registry.clone();
        for obs in &registry.shipments {
            obs.deleting(self, &shipment)?;
        }
        for item in self
            .store
            .shipment_items_for_shipment(&self.txn, shipment_id)?
        {
            self.store.remove_shipment_item(&self.txn, &item)?;
        }
        for package in self.store.packages_for_shipment(&self.txn, shipment_id)? {
            self.delete_package(package.id)?;
        }
        self.store.remove_shipment(&self.txn, &shipment)?;
        Ok(())
    }

    pub fn save_shipment_item(&mut self, mut item: ShipmentItem) -> OmsResult<ShipmentItem> {
        if item.id == 0 {
            item.id = self.store.next_id(&self.txn)?;
        } else if let Some(old) = self.store.get_shipment_item(&self.txn, item.id)? {
            // Both ends of the link feed index tables and are fixed at
            // creation.
            if item.shipment_id != old.shipment_id || item.basket_item_id != old.basket_item_id {
                return Err(OmsError::InvalidOperation(format!(
                    "shipment item {} links are fixed at creation",
                    item.id
                )));
            }
        }
        self.store.put_shipment_item(&self.txn, &item)?;
        Ok(item)
    }

    pub fn save_package(&mut self, mut package: ShipmentPackage) -> OmsResult<ShipmentPackage> {
        if package.id == 0 {
            package.id = self.store.next_id(&self.txn)?;
        } else if let Some(old) = self.store.get_package(&self.txn, package.id)? {
            if package.shipment_id != old.shipment_id {
                return Err(OmsError::InvalidOperation(format!(
                    "package {} cannot move from shipment {} to shipment {}",
                    package.id, old.shipment_id, package.shipment_id
                )));
            }
        }
        self.store.put_package(&self.txn, &package)?;
        Ok(package)
    }

    pub fn delete_package(&mut self, package_id: u64) -> OmsResult<()> {
        let package = self
            .store
            .get_package(&self.txn, package_id)?
            .ok_or_else(|| OmsError::InvalidOperation(format!("package {package_id} not found")))?;
        for item in self.store.package_items_for_package(&self.txn, package_id)? {
            self.store.remove_package_item(&self.txn, &item)?;
        }
        self.store.remove_package(&self.txn, &package)?;
        Ok(())
    }

    pub fn save_package_item(
        &mut self,
        mut item: ShipmentPackageItem,
    ) -> OmsResult<ShipmentPackageItem> {
        if item.id == 0 {
            item.id = self.store.next_id(&self.txn)?;
        } else if let Some(old) = self.store.get_package_item(&self.txn, item.id)? {
            if item.package_id != old.package_id || item.basket_item_id != old.basket_item_id {
                return Err(OmsError::InvalidOperation(format!(
                    "package item {} links are fixed at creation",
                    item.id
                )));
            }
        }
        self.store.put_package_item(&self.txn, &item)?;
        Ok(item)
    }

    // ========== Order returns ==========

    pub fn save_return(&mut self, mut ret: OrderReturn) -> OmsResult<OrderReturn> {
        let old = if ret.id == 0 {
            None
        } else {
            self.store.get_return(&self.txn, ret.id)?
        };
        if ret.id == 0 {
            ret.id = self.store.next_id(&self.txn)?;
        }
        let registry = self.registry.clone();
        for obs in &registry.returns {
            obs.saving(self, &mut ret, old.as_ref())?;
        }
        self.store.put_return(&self.txn, &ret)?;
        match &old {
            None => {
                for obs in &registry.returns {
                    obs.created(self, &ret)?;
                }
            }
            Some(prev) => {
                for obs in &registry.returns {
                    obs.updated(self, &ret, prev)?;
                }
            }
        }
        Ok(ret)
    }

    pub fn delete_return(&mut self, return_id: u64) -> OmsResult<()> {
        let ret = self
            .store
            .get_return(&self.txn, return_id)?
            .ok_or(OmsError::ReturnNotFound(return_id))?;
        let registry = self.registry.clone();
        for obs in &registry.returns {
            obs.deleting(self, &ret)?;
        }
        for item in self.store.return_items_for_return(&self.txn, return_id)? {
            self.store.remove_return_item(&self.txn, &item)?;
        }
        self.store.remove_return(&self.txn, &ret)?;
        Ok(())
    }

    pub fn save_return_item(&mut self, mut item: OrderReturnItem) -> OmsResult<OrderReturnItem> {
        if item.id == 0 {
            item.id = self.store.next_id(&self.txn)?;
        } else if let Some(old) = self.store.get_return_item(&self.txn, item.id)? {
            if item.return_id != old.return_id {
                return Err(OmsError::InvalidOperation(format!(
                    "return item {} cannot move from return {} to return {}",
                    item.id, old.return_id, item.return_id
                )));
            }
        }
        self.store.put_return_item(&self.txn, &item)?;
        Ok(item)
    }

    // ========== Comments ==========

    pub fn save_comment(&mut self, mut comment: OrderComment) -> OmsResult<OrderComment> {
        let old = if comment.id == 0 {
            None
        } else {
            self.store.get_comment(&self.txn, comment.id)?
        };
        if comment.id == 0 {
            comment.id = self.store.next_id(&self.txn)?;
        }
        let registry = self.registry.clone();
        for obs in &registry.comments {
            obs.saving(self, &mut comment, old.as_ref())?;
        }
        self.store.put_comment(&self.txn, &comment)?;
        match &old {
            None => {
                for obs in &registry.comments {
                    obs.created(self, &comment)?;
                }
            }
            Some(prev) => {
                for obs in &registry.comments {
                    obs.updated(self, &comment, prev)?;
                }
            }
        }
        Ok(comment)
    }

    pub fn delete_comment(&mut self, comment_id: u64) -> OmsResult<()> {
        let comment = self
            .store
            .get_comment(&self.txn, comment_id)?
            .ok_or_else(|| OmsError::InvalidOperation(format!("comment {comment_id} not found")))?;
        let registry = self.registry.clone();
        for obs in &registry.comments {
            obs.deleting(self, &comment)?;
        }
        self.store.remove_comment(&self.txn, &comment)?;
        Ok(())
    }
}
