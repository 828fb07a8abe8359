//! Entity observers
//!
//! Typed lifecycle dispatch. Every hook has an empty default so an observer
//! implements only what it cares about:
//!
//! - `saving` runs before the row is written and may rewrite the new value
//!   (timestamp stamping, guid assignment, immutability guards);
//! - `created` / `updated` run after the write and drive cascades;
//! - `deleting` runs before removal and drives cascade deletes.
//!
//! The registry is explicit process-wide state built once at startup. Its
//! fields are public so a host (or a test) can register extra observers.

pub mod basket;
pub mod comment;
pub mod order;
pub mod order_return;
pub mod payment;
pub mod receipt;
pub mod shipment;

use crate::error::OmsResult;
use crate::uow::UnitOfWork;
use shared::models::{
    Basket, BasketItem, Order, OrderComment, OrderReturn, Payment, PaymentReceipt, Shipment,
};

pub trait EntityObserver<T>: Send + Sync {
    /// Before the row is written. `old` is the persisted value, `None` on
    /// create.
    fn saving(&self, _uow: &mut UnitOfWork, _new: &mut T, _old: Option<&T>) -> OmsResult<()> {
        Ok(())
    }

    /// After a fresh row was written.
    fn created(&self, _uow: &mut UnitOfWork, _new: &T) -> OmsResult<()> {
        Ok(())
    }

    /// After an existing row was rewritten.
    fn updated(&self, _uow: &mut UnitOfWork, _new: &T, _old: &T) -> OmsResult<()> {
        Ok(())
    }

    /// Before the row is removed.
    fn deleting(&self, _uow: &mut UnitOfWork, _entity: &T) -> OmsResult<()> {
        Ok(())
    }
}

/// Observer registry, one vector per observed entity type.
#[derive(Default)]
pub struct ObserverRegistry {
    pub baskets: Vec<Box<dyn EntityObserver<Basket>>>,
    pub basket_items: Vec<Box<dyn EntityObserver<BasketItem>>>,
    pub orders: Vec<Box<dyn EntityObserver<Order>>>,
    pub payments: Vec<Box<dyn EntityObserver<Payment>>>,
    pub receipts: Vec<Box<dyn EntityObserver<PaymentReceipt>>>,
    pub shipments: Vec<Box<dyn EntityObserver<Shipment>>>,
    pub returns: Vec<Box<dyn EntityObserver<OrderReturn>>>,
    pub comments: Vec<Box<dyn EntityObserver<OrderComment>>>,
}

impl ObserverRegistry {
    /// The standard production wiring.
    pub fn standard() -> Self {
        Self {
            baskets: vec![Box::new(basket::BasketObserver)],
            basket_items: vec![Box::new(basket::BasketItemObserver)],
            orders: vec![Box::new(order::OrderObserver)],
            payments: vec![Box::new(payment::PaymentObserver)],
            receipts: vec![Box::new(receipt::ReceiptObserver)],
            shipments: vec![Box::new(shipment::ShipmentObserver)],
            returns: vec![Box::new(order_return::OrderReturnObserver)],
            comments: vec![Box::new(comment::CommentObserver)],
        }
    }
}
