mod common;

use common::harness;
use shared::models::{BasketType, Delivery, DeliveryMethod, Shipment};

fn delivery_setup(h: &common::TestHarness, method: DeliveryMethod) -> u64 {
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    let order = h.manager.create_order(basket.id, "A-1").unwrap();
    let mut delivery = Delivery::new(order.id, method);
    if method == DeliveryMethod::Pickup {
        delivery.point_id = Some(5);
    }
    let delivery = h.manager.create_delivery(delivery).unwrap();
    let mut shipment = Shipment::new(delivery.id, 7);
    shipment.cost = 250.0;
    h.manager.create_shipment(shipment).unwrap();
    delivery.id
}

#[test]
fn shipped_notification_includes_the_cost_sum() {
    let h = harness();
    let delivery_id = delivery_setup(&h, DeliveryMethod::Courier);

    h.manager.notify_delivery_shipped(delivery_id).unwrap();

    let messages = h.sms.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("250.00"));
    assert_eq!(messages[0].0, vec!["+79990001122".to_string()]);
}

#[test]
fn pickup_ready_notification_includes_point_details() {
    let h = harness();
    let delivery_id = delivery_setup(&h, DeliveryMethod::Pickup);

    h.manager.notify_delivery_ready(delivery_id).unwrap();

    let messages = h.sms.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.contains("12 Harbor St"));
    assert!(messages[0].1.contains("09:00-21:00"));
}

#[test]
fn pickup_ready_notification_only_applies_to_pickup_deliveries() {
    let h = harness();
    let delivery_id = delivery_setup(&h, DeliveryMethod::Courier);

    h.manager.notify_delivery_ready(delivery_id).unwrap();

    assert!(h.sms.messages.lock().unwrap().is_empty());
}
