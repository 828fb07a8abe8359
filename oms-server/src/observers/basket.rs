//! Basket and basket item observers
//!
//! The basket observer enforces post-order immutability and cascades basket
//! deletion into its items. The item observer drives search re-indexing,
//! shipment recalculation, link cleanup and the per-order audit trail.

use super::EntityObserver;
use crate::engine::shipments;
use crate::error::{OmsError, OmsResult};
use crate::store::StoreError;
use crate::uow::{SideEffect, UnitOfWork};
use shared::models::{Basket, BasketItem, HistoryEntity, HistoryType};

pub struct BasketObserver;

impl EntityObserver<Basket> for BasketObserver {
    fn saving(&self, _uow: &mut UnitOfWork, new: &mut Basket, old: Option<&Basket>) -> OmsResult<()> {
        let Some(old) = old else {
            return Ok(());
        };
        if old.belongs_to_order {
            // Once claimed by an order the basket row is frozen; only its
            // items may still change.
            if *new != *old {
                return Err(OmsError::InvalidOperation(format!(
                    "basket {} belongs to an order and cannot be modified",
                    old.id
                )));
            }
        } else if new.belongs_to_order
            && (new.customer_id != old.customer_id || new.basket_type != old.basket_type)
        {
            return Err(OmsError::InvalidOperation(format!(
                "basket {} cannot change while being claimed by an order",
                old.id
            )));
        }
        Ok(())
    }

    fn deleting(&self, uow: &mut UnitOfWork, entity: &Basket) -> OmsResult<()> {
        for item in uow.store().items_for_basket(uow.txn(), entity.id)? {
            uow.delete_basket_item(item.id)?;
        }
        Ok(())
    }
}

pub struct BasketItemObserver;

impl BasketItemObserver {
    /// Order owning the item's basket, if the basket has been claimed.
    fn owning_order(uow: &UnitOfWork, item: &BasketItem) -> OmsResult<Option<u64>> {
        Ok(uow.store().order_for_basket(uow.txn(), item.basket_id)?)
    }

    fn record(
        uow: &mut UnitOfWork,
        item: &BasketItem,
        history_type: HistoryType,
    ) -> OmsResult<()> {
        let Some(order_id) = Self::owning_order(uow, item)? else {
            return Ok(());
        };
        let payload = serde_json::to_value(item).map_err(StoreError::from)?;
        uow.record_history(
            order_id,
            history_type,
            HistoryEntity::BasketItem,
            item.id,
            payload,
        )
    }
}

impl EntityObserver<BasketItem> for BasketItemObserver {
    fn saving(
        &self,
        _uow: &mut UnitOfWork,
        new: &mut BasketItem,
        old: Option<&BasketItem>,
    ) -> OmsResult<()> {
        // Ownership edges are keyed by the parent id; an item never moves
        // between baskets.
        if let Some(old) = old {
            if new.basket_id != old.basket_id {
                return Err(OmsError::InvalidOperation(format!(
                    "basket item {} cannot move from basket {} to basket {}",
                    old.id, old.basket_id, new.basket_id
                )));
            }
        }
        Ok(())
    }

    fn created(&self, uow: &mut UnitOfWork, new: &BasketItem) -> OmsResult<()> {
        uow.effect(SideEffect::ReindexOffer {
            offer_id: new.offer_id,
        });
        Self::record(uow, new, HistoryType::Create)
    }

    fn updated(&self, uow: &mut UnitOfWork, new: &BasketItem, old: &BasketItem) -> OmsResult<()> {
        let qty_changed = new.qty != old.qty;
        let price_changed = new.price != old.price;
        if qty_changed || price_changed {
            if let Some(link) = uow
                .store()
                .shipment_item_for_basket_item(uow.txn(), new.id)?
            {
                // Two independent triggers: qty drives the quantity total,
                // qty or price drives the cost total.
                if qty_changed {
                    shipments::recalc(uow, link.shipment_id)?;
                }
                shipments::cost_recalc(uow, link.shipment_id)?;
            }
        }
        Self::record(uow, new, HistoryType::Update)
    }

    fn deleting(&self, uow: &mut UnitOfWork, entity: &BasketItem) -> OmsResult<()> {
        uow.effect(SideEffect::ReindexOffer {
            offer_id: entity.offer_id,
        });
        // Links go first, then the row.
        if let Some(link) = uow
            .store()
            .shipment_item_for_basket_item(uow.txn(), entity.id)?
        {
            uow.store().remove_shipment_item(uow.txn(), &link)?;
        }
        if let Some(link) = uow
            .store()
            .package_item_for_basket_item(uow.txn(), entity.id)?
        {
            uow.store().remove_package_item(uow.txn(), &link)?;
        }
        Self::record(uow, entity, HistoryType::Delete)
    }
}
