//! Shipment aggregate recalculation
//!
//! Both totals are pure functions of the shipment's current item state and
//! are recomputed in full on every trigger, so repeated invocation is
//! idempotent.

use crate::error::{OmsError, OmsResult};
use crate::money;
use crate::uow::UnitOfWork;
use shared::models::{BasketItem, ShipmentId};

fn linked_items(uow: &UnitOfWork, shipment_id: ShipmentId) -> OmsResult<Vec<BasketItem>> {
    let links = uow
        .store()
        .shipment_items_for_shipment(uow.txn(), shipment_id)?;
    let mut items = Vec::with_capacity(links.len());
    for link in links {
        if let Some(item) = uow.store().get_basket_item(uow.txn(), link.basket_item_id)? {
            items.push(item);
        }
    }
    Ok(items)
}

/// Recompute the shipment's quantity total.
pub fn recalc(uow: &mut UnitOfWork, shipment_id: ShipmentId) -> OmsResult<()> {
    let mut shipment = uow
        .store()
        .get_shipment(uow.txn(), shipment_id)?
        .ok_or(OmsError::ShipmentNotFound(shipment_id))?;
    let items = linked_items(uow, shipment_id)?;
    shipment.qty = money::sum(items.iter().map(|i| i.qty));
    uow.save_shipment(shipment)?;
    Ok(())
}

/// Recompute the shipment's cost total. Unpriced items contribute nothing.
pub fn cost_recalc(uow: &mut UnitOfWork, shipment_id: ShipmentId) -> OmsResult<()> {
    let mut shipment = uow
        .store()
        .get_shipment(uow.txn(), shipment_id)?
        .ok_or(OmsError::ShipmentNotFound(shipment_id))?;
    let items = linked_items(uow, shipment_id)?;
    shipment.cost = money::sum(
        items
            .iter()
            .map(|i| money::line_cost(i.qty, i.price.unwrap_or(0.0))),
    );
    uow.save_shipment(shipment)?;
    Ok(())
}
