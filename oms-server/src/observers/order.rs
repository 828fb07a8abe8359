//! Order lifecycle observer
//!
//! Stamps the `*_at` companion of every tracked field iff that field changed,
//! keeps the audit trail, claims the basket on creation, and cascades
//! deletion into everything the order owns.

use super::EntityObserver;
use crate::error::{OmsError, OmsResult};
use crate::store::StoreError;
use crate::uow::{SideEffect, UnitOfWork};
use chrono::Utc;
use shared::models::{BasketType, HistoryEntity, HistoryType, Order, PaymentStatus};

pub struct OrderObserver;

impl EntityObserver<Order> for OrderObserver {
    fn saving(&self, _uow: &mut UnitOfWork, new: &mut Order, old: Option<&Order>) -> OmsResult<()> {
        let Some(old) = old else {
            return Ok(());
        };
        if new.basket_id != old.basket_id {
            return Err(OmsError::InvalidOperation(format!(
                "order {} is bound to basket {} for life",
                old.id, old.basket_id
            )));
        }
        let now = Utc::now();
        if new.status != old.status {
            new.status_at = Some(now);
        } else {
            new.status_at = old.status_at;
        }
        if new.payment_status != old.payment_status {
            new.payment_status_at = Some(now);
        } else {
            new.payment_status_at = old.payment_status_at;
        }
        if new.is_problem != old.is_problem {
            new.is_problem_at = Some(now);
        } else {
            new.is_problem_at = old.is_problem_at;
        }
        Ok(())
    }

    fn created(&self, uow: &mut UnitOfWork, new: &Order) -> OmsResult<()> {
        // Claim the basket. A missing basket fails the whole creation.
        let mut basket = uow
            .store()
            .get_basket(uow.txn(), new.basket_id)?
            .ok_or(OmsError::BasketNotFound(new.basket_id))?;
        basket.belongs_to_order = true;
        uow.save_basket(basket)?;

        let items = uow.store().items_for_basket(uow.txn(), new.basket_id)?;
        let payload = serde_json::json!({ "order": new, "items": items });
        uow.record_history(new.id, HistoryType::Create, HistoryEntity::Order, new.id, payload)
    }

    fn updated(&self, uow: &mut UnitOfWork, new: &Order, old: &Order) -> OmsResult<()> {
        let payload = serde_json::to_value(new).map_err(StoreError::from)?;
        uow.record_history(new.id, HistoryType::Update, HistoryEntity::Order, new.id, payload)?;

        if new.payment_status != old.payment_status {
            if new.order_type == BasketType::Certificate {
                uow.effect(SideEffect::MarketingPaymentStatus {
                    order_id: new.id,
                    payment_status: new.payment_status,
                });
            }
            if new.payment_status == PaymentStatus::Paid {
                uow.effect(SideEffect::OrderPaid { order_id: new.id });
            }
        }
        Ok(())
    }

    fn deleting(&self, uow: &mut UnitOfWork, entity: &Order) -> OmsResult<()> {
        let payload = serde_json::to_value(entity).map_err(StoreError::from)?;
        uow.record_history(
            entity.id,
            HistoryType::Delete,
            HistoryEntity::Order,
            entity.id,
            payload,
        )?;

        uow.delete_basket(entity.basket_id)?;
        for delivery in uow.store().deliveries_for_order(uow.txn(), entity.id)? {
            uow.delete_delivery(delivery.id)?;
        }
        // The order row itself is going away, so payments are removed without
        // dispatch (no point refreshing a status that is being deleted).
        for payment in uow.store().payments_for_order(uow.txn(), entity.id)? {
            uow.remove_payment_with_receipts(&payment)?;
        }
        for ret in uow.store().returns_for_order(uow.txn(), entity.id)? {
            uow.delete_return(ret.id)?;
        }
        for comment in uow.store().comments_for_order(uow.txn(), entity.id)? {
            uow.delete_comment(comment.id)?;
        }
        Ok(())
    }
}
