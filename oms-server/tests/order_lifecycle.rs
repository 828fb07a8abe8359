mod common;

use common::{harness, harness_with};
use oms_server::OmsError;
use oms_server::observers::{EntityObserver, ObserverRegistry};
use oms_server::uow::UnitOfWork;
use shared::models::{
    BasketItem, BasketType, Delivery, DeliveryMethod, HistoryEntity, HistoryType, OrderStatus,
    Shipment,
};

#[test]
fn order_creation_claims_basket_and_records_history() {
    let h = harness();
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    let item = h
        .manager
        .save_basket_item(BasketItem::new(basket.id, 900, "Sneakers", 2.0).with_price(100.0))
        .unwrap();

    let order = h.manager.create_order(basket.id, "A-1001").unwrap();
    assert_eq!(order.price, 200.0);
    assert_eq!(order.order_type, BasketType::Product);

    let basket = h.manager.basket(basket.id).unwrap();
    assert!(basket.belongs_to_order);

    let history = h.manager.order_history(order.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].history_type, HistoryType::Create);
    assert_eq!(history[0].entity, HistoryEntity::Order);
    // The creation snapshot captures the basket items' initial state.
    assert_eq!(history[0].payload["items"][0]["id"], item.id);
    assert_eq!(history[0].payload["items"][0]["qty"], 2.0);
}

#[test]
fn creating_a_second_order_from_the_same_basket_fails() {
    let h = harness();
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    h.manager.create_order(basket.id, "A-1").unwrap();

    let err = h.manager.create_order(basket.id, "A-2").unwrap_err();
    assert!(matches!(err, OmsError::BasketAlreadyOrdered(_)));
}

#[test]
fn claimed_basket_cannot_be_deleted_directly() {
    let h = harness();
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    h.manager.create_order(basket.id, "A-1").unwrap();

    let err = h.manager.delete_basket(basket.id).unwrap_err();
    assert!(matches!(err, OmsError::InvalidOperation(_)));
}

#[test]
fn status_timestamps_stamp_iff_value_changed() {
    let h = harness();
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    let mut order = h.manager.create_order(basket.id, "A-1").unwrap();
    assert!(order.status_at.is_none());

    order.status = OrderStatus::InProcessing;
    let order = h.manager.save_order(order).unwrap();
    let stamped = order.status_at.expect("status change stamps status_at");
    assert!(order.payment_status_at.is_none());
    assert!(order.is_problem_at.is_none());

    // Re-saving with no change moves nothing.
    let order = h.manager.save_order(order).unwrap();
    assert_eq!(order.status_at, Some(stamped));

    let mut order = order;
    order.is_problem = true;
    let order = h.manager.save_order(order).unwrap();
    assert!(order.is_problem_at.is_some());
    assert_eq!(order.status_at, Some(stamped));
}

#[test]
fn basket_item_changes_are_audited_once_order_exists() {
    let h = harness();
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    let item = h
        .manager
        .save_basket_item(BasketItem::new(basket.id, 900, "Sneakers", 2.0).with_price(100.0))
        .unwrap();
    let order = h.manager.create_order(basket.id, "A-1").unwrap();

    let mut item = item;
    item.qty = 3.0;
    h.manager.save_basket_item(item.clone()).unwrap();
    h.manager.delete_basket_item(item.id).unwrap();

    let kinds: Vec<(HistoryType, HistoryEntity)> = h
        .manager
        .order_history(order.id)
        .unwrap()
        .iter()
        .map(|r| (r.history_type, r.entity))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (HistoryType::Create, HistoryEntity::Order),
            (HistoryType::Update, HistoryEntity::BasketItem),
            (HistoryType::Delete, HistoryEntity::BasketItem),
        ]
    );
}

#[test]
fn basket_items_never_move_between_baskets() {
    let h = harness();
    let a = h.manager.create_basket(42, BasketType::Product).unwrap();
    let b = h.manager.create_basket(42, BasketType::Product).unwrap();
    let item = h
        .manager
        .save_basket_item(BasketItem::new(a.id, 900, "Sneakers", 1.0))
        .unwrap();

    let mut moved = item.clone();
    moved.basket_id = b.id;
    let err = h.manager.save_basket_item(moved).unwrap_err();
    assert!(matches!(err, OmsError::InvalidOperation(_)));

    // The item lists under its original basket and nowhere else.
    let in_a: Vec<u64> = h
        .manager
        .basket_items(a.id)
        .unwrap()
        .iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(in_a, vec![item.id]);
    assert!(h.manager.basket_items(b.id).unwrap().is_empty());
}

#[test]
fn item_create_and_delete_request_reindexing() {
    let h = harness();
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    let item = h
        .manager
        .save_basket_item(BasketItem::new(basket.id, 900, "Sneakers", 1.0))
        .unwrap();
    h.manager.delete_basket_item(item.id).unwrap();

    assert_eq!(*h.search.calls.lock().unwrap(), vec![900, 900]);
}

#[test]
fn comments_land_in_the_audit_trail() {
    let h = harness();
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    let order = h.manager.create_order(basket.id, "A-1").unwrap();
    h.manager.add_comment(order.id, "customer asked to reschedule").unwrap();

    let history = h.manager.order_history(order.id).unwrap();
    let comment = history.last().unwrap();
    assert_eq!(comment.history_type, HistoryType::Comment);
    assert_eq!(comment.payload["text"], "customer asked to reschedule");
}

fn order_with_deliveries(h: &common::TestHarness) -> (u64, u64, Vec<u64>, Vec<u64>) {
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    let item = h
        .manager
        .save_basket_item(BasketItem::new(basket.id, 900, "Sneakers", 2.0).with_price(100.0))
        .unwrap();
    let order = h.manager.create_order(basket.id, "A-1").unwrap();

    let mut deliveries = Vec::new();
    let mut shipments = Vec::new();
    for _ in 0..2 {
        let delivery = h
            .manager
            .create_delivery(Delivery::new(order.id, DeliveryMethod::Courier))
            .unwrap();
        for merchant in [7, 8] {
            let shipment = h
                .manager
                .create_shipment(Shipment::new(delivery.id, merchant))
                .unwrap();
            shipments.push(shipment.id);
        }
        deliveries.push(delivery.id);
    }
    (order.id, item.id, deliveries, shipments)
}

#[test]
fn deleting_an_order_removes_the_whole_tree() {
    let h = harness();
    let (order_id, item_id, deliveries, shipments) = order_with_deliveries(&h);

    h.manager.delete_order(order_id).unwrap();

    assert!(matches!(
        h.manager.order(order_id),
        Err(OmsError::OrderNotFound(_))
    ));
    assert!(h.manager.store().load_basket_item(item_id).unwrap().is_none());
    for id in deliveries {
        assert!(h.manager.store().load_delivery(id).unwrap().is_none());
    }
    for id in shipments {
        assert!(h.manager.store().load_shipment(id).unwrap().is_none());
    }
}

struct PoisonedItemDelete;

impl EntityObserver<BasketItem> for PoisonedItemDelete {
    fn deleting(&self, _uow: &mut UnitOfWork, _entity: &BasketItem) -> oms_server::OmsResult<()> {
        Err(OmsError::InvalidOperation("induced cascade failure".into()))
    }
}

#[test]
fn failed_cascade_leaves_database_untouched() {
    let mut registry = ObserverRegistry::standard();
    registry.basket_items.push(Box::new(PoisonedItemDelete));
    let h = harness_with(registry, false);
    let (order_id, item_id, deliveries, shipments) = order_with_deliveries(&h);
    let history_before = h.manager.order_history(order_id).unwrap().len();

    let err = h.manager.delete_order(order_id).unwrap_err();
    assert!(matches!(err, OmsError::InvalidOperation(_)));

    // Everything survives, including the audit trail length.
    assert!(h.manager.order(order_id).is_ok());
    assert!(h.manager.store().load_basket_item(item_id).unwrap().is_some());
    for id in deliveries {
        assert!(h.manager.store().load_delivery(id).unwrap().is_some());
    }
    for id in shipments {
        assert!(h.manager.store().load_shipment(id).unwrap().is_some());
    }
    assert_eq!(h.manager.order_history(order_id).unwrap().len(), history_before);
}
