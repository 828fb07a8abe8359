mod common;

use common::harness_with;
use oms_server::observers::{EntityObserver, ObserverRegistry};
use oms_server::uow::UnitOfWork;
use shared::models::{
    BasketItem, BasketType, Delivery, DeliveryMethod, Shipment, ShipmentPaymentStatus,
    ShipmentStatus,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn shipment_setup(h: &common::TestHarness) -> (u64, u64) {
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    let item = h
        .manager
        .save_basket_item(BasketItem::new(basket.id, 900, "Sneakers", 2.0).with_price(100.0))
        .unwrap();
    let order = h.manager.create_order(basket.id, "A-1").unwrap();
    let delivery = h
        .manager
        .create_delivery(Delivery::new(order.id, DeliveryMethod::Courier))
        .unwrap();
    let shipment = h
        .manager
        .create_shipment(Shipment::new(delivery.id, 7))
        .unwrap();
    h.manager.add_shipment_item(shipment.id, item.id).unwrap();
    (shipment.id, item.id)
}

#[test]
fn paid_shipment_of_approval_merchant_settles_into_checking() {
    let h = harness_with(ObserverRegistry::standard(), true);
    let (shipment_id, _) = shipment_setup(&h);
    let lookups_before = h.merchants.lookups.load(Ordering::SeqCst);

    let mut shipment = h.manager.shipment(shipment_id).unwrap();
    shipment.payment_status = ShipmentPaymentStatus::PaidRequiresApproval;
    let shipment = h.manager.save_shipment(shipment).unwrap();

    assert_eq!(shipment.status, ShipmentStatus::Checking);
    assert_eq!(
        h.manager.shipment(shipment_id).unwrap().status,
        ShipmentStatus::Checking
    );
    // One config lookup for the one update pass; the correction itself does
    // not re-enter the hook.
    assert_eq!(h.merchants.lookups.load(Ordering::SeqCst), lookups_before + 1);
}

#[test]
fn merchant_without_approval_keeps_shipment_status() {
    let h = harness_with(ObserverRegistry::standard(), false);
    let (shipment_id, _) = shipment_setup(&h);

    let mut shipment = h.manager.shipment(shipment_id).unwrap();
    shipment.payment_status = ShipmentPaymentStatus::PaidRequiresApproval;
    let shipment = h.manager.save_shipment(shipment).unwrap();

    assert_eq!(shipment.status, ShipmentStatus::Created);
}

#[test]
fn unpaid_shipment_never_consults_the_merchant_directory() {
    let h = harness_with(ObserverRegistry::standard(), true);
    let (shipment_id, _) = shipment_setup(&h);
    let lookups_before = h.merchants.lookups.load(Ordering::SeqCst);

    let mut shipment = h.manager.shipment(shipment_id).unwrap();
    shipment.payment_status = ShipmentPaymentStatus::Hold;
    h.manager.save_shipment(shipment).unwrap();

    assert_eq!(h.merchants.lookups.load(Ordering::SeqCst), lookups_before);
}

#[test]
fn linking_an_item_fills_the_shipment_totals() {
    let h = harness_with(ObserverRegistry::standard(), false);
    let (shipment_id, _) = shipment_setup(&h);

    let shipment = h.manager.shipment(shipment_id).unwrap();
    assert_eq!(shipment.qty, 2.0);
    assert_eq!(shipment.cost, 200.0);
}

#[derive(Default)]
struct CountingShipmentObserver {
    updates: Arc<AtomicUsize>,
}

impl EntityObserver<Shipment> for CountingShipmentObserver {
    fn updated(
        &self,
        _uow: &mut UnitOfWork,
        _new: &Shipment,
        _old: &Shipment,
    ) -> oms_server::OmsResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn qty_change_recalculates_quantity_and_cost_exactly_once_each() {
    let updates = Arc::new(AtomicUsize::new(0));
    let mut registry = ObserverRegistry::standard();
    registry.shipments.push(Box::new(CountingShipmentObserver {
        updates: updates.clone(),
    }));
    let h = harness_with(registry, false);
    let (shipment_id, item_id) = shipment_setup(&h);
    updates.store(0, Ordering::SeqCst);

    let mut item = h.manager.store().load_basket_item(item_id).unwrap().unwrap();
    item.qty = 5.0;
    h.manager.save_basket_item(item).unwrap();

    let shipment = h.manager.shipment(shipment_id).unwrap();
    assert_eq!(shipment.qty, 5.0);
    assert_eq!(shipment.cost, 500.0);
    // One save from the quantity recalc, one from the cost recalc.
    assert_eq!(updates.load(Ordering::SeqCst), 2);
}

#[test]
fn price_change_alone_recalculates_cost_only() {
    let updates = Arc::new(AtomicUsize::new(0));
    let mut registry = ObserverRegistry::standard();
    registry.shipments.push(Box::new(CountingShipmentObserver {
        updates: updates.clone(),
    }));
    let h = harness_with(registry, false);
    let (shipment_id, item_id) = shipment_setup(&h);
    updates.store(0, Ordering::SeqCst);

    let mut item = h.manager.store().load_basket_item(item_id).unwrap().unwrap();
    item.price = Some(150.0);
    h.manager.save_basket_item(item).unwrap();

    let shipment = h.manager.shipment(shipment_id).unwrap();
    assert_eq!(shipment.qty, 2.0);
    assert_eq!(shipment.cost, 300.0);
    assert_eq!(updates.load(Ordering::SeqCst), 1);
}

#[test]
fn deleting_a_basket_item_removes_its_shipment_links_first() {
    let h = harness_with(ObserverRegistry::standard(), false);
    let (shipment_id, item_id) = shipment_setup(&h);
    let package = h.manager.add_package(shipment_id, Some(1200.0)).unwrap();
    h.manager.add_package_item(package.id, item_id, 2.0).unwrap();

    h.manager.delete_basket_item(item_id).unwrap();

    let store = h.manager.store();
    assert!(store.load_basket_item(item_id).unwrap().is_none());
    // The shipment itself survives; only the links are gone.
    assert!(store.load_shipment(shipment_id).unwrap().is_some());
}

#[test]
fn deleting_a_delivery_cascades_into_shipments() {
    let h = harness_with(ObserverRegistry::standard(), false);
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    let order = h.manager.create_order(basket.id, "A-1").unwrap();
    let delivery = h
        .manager
        .create_delivery(Delivery::new(order.id, DeliveryMethod::Courier))
        .unwrap();
    let shipment = h
        .manager
        .create_shipment(Shipment::new(delivery.id, 7))
        .unwrap();
    let package = h.manager.add_package(shipment.id, None).unwrap();

    h.manager.delete_delivery(delivery.id).unwrap();

    let store = h.manager.store();
    assert!(store.load_delivery(delivery.id).unwrap().is_none());
    assert!(store.load_shipment(shipment.id).unwrap().is_none());
    // Package rows go with their shipment.
    let txn = store.begin_write().unwrap();
    assert!(store.get_package(&txn, package.id).unwrap().is_none());
}
