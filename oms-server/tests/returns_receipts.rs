mod common;

use common::harness;
use oms_server::OmsError;
use shared::models::{BasketItem, BasketType, PaymentStatus, PaymentSystem, ReceiptStatus, ReturnStatus};

fn paid_order(h: &common::TestHarness) -> u64 {
    let basket = h.manager.create_basket(42, BasketType::Product).unwrap();
    h.manager
        .save_basket_item(BasketItem::new(basket.id, 900, "Sneakers", 3.0).with_price(100.0))
        .unwrap();
    let order = h.manager.create_order(basket.id, "A-1").unwrap();
    let mut payment = h
        .manager
        .create_payment(order.id, PaymentSystem::Yandex, None)
        .unwrap();
    payment.status = PaymentStatus::Paid;
    h.manager.save_payment(payment).unwrap();
    order.id
}

#[test]
fn return_creation_refunds_the_full_price() {
    let h = harness();
    let order_id = paid_order(&h);

    let ret = h.manager.create_return(order_id, 300.0).unwrap();
    assert_eq!(ret.status, ReturnStatus::New);
    assert_eq!(*h.provider.refunds.lock().unwrap(), vec![300.0]);
}

#[test]
fn lowering_a_return_price_reverses_the_difference() {
    let h = harness();
    let order_id = paid_order(&h);
    let mut ret = h.manager.create_return(order_id, 300.0).unwrap();

    ret.price = 200.0;
    h.manager.save_return(ret).unwrap();

    assert_eq!(*h.provider.refunds.lock().unwrap(), vec![300.0, -100.0]);
}

#[test]
fn resaving_a_return_without_price_change_refunds_nothing() {
    let h = harness();
    let order_id = paid_order(&h);
    let mut ret = h.manager.create_return(order_id, 300.0).unwrap();

    ret.status = ReturnStatus::Processing;
    let ret = h.manager.save_return(ret).unwrap();
    assert!(ret.status_at.is_some());
    assert_eq!(*h.provider.refunds.lock().unwrap(), vec![300.0]);
}

#[test]
fn return_status_timestamp_stamps_iff_status_changed() {
    let h = harness();
    let order_id = paid_order(&h);
    let ret = h.manager.create_return(order_id, 300.0).unwrap();
    assert!(ret.status_at.is_none());

    let mut ret = ret;
    ret.status = ReturnStatus::Processing;
    let ret = h.manager.save_return(ret).unwrap();
    let stamped = ret.status_at.unwrap();

    let ret = h.manager.save_return(ret).unwrap();
    assert_eq!(ret.status_at, Some(stamped));
}

#[test]
fn return_items_attach_to_their_claim() {
    let h = harness();
    let order_id = paid_order(&h);
    let items = h.manager.basket_items(h.manager.order(order_id).unwrap().basket_id).unwrap();
    let ret = h.manager.create_return(order_id, 100.0).unwrap();

    let line = h
        .manager
        .add_return_item(ret.id, items[0].id, 1.0, 100.0)
        .unwrap();
    assert!(line.id != 0);

    h.manager.delete_return(ret.id).unwrap();
    assert!(matches!(
        h.manager.order_return(ret.id),
        Err(OmsError::ReturnNotFound(_))
    ));
}

#[test]
fn receipts_always_carry_a_guid_and_keep_it() {
    let h = harness();
    let order_id = paid_order(&h);
    // The Paid transition in the setup issued the income receipt.
    let payment = h.manager.store().load_payments_for_order(order_id).unwrap().remove(0);
    let receipt = h.manager.receipts_for_payment(payment.id).unwrap().remove(0);
    let guid = receipt.guid.clone().expect("guid assigned at creation");

    let mut receipt = receipt;
    receipt.guid = None;
    receipt.status = ReceiptStatus::Sent;
    let receipt = h.manager.save_receipt(receipt).unwrap();

    // The persisted guid wins over the caller's blank.
    assert_eq!(receipt.guid, Some(guid));
}

#[test]
fn receipt_payed_at_follows_status_changes() {
    let h = harness();
    let order_id = paid_order(&h);
    let payment = h.manager.store().load_payments_for_order(order_id).unwrap().remove(0);
    let receipt = h.manager.receipts_for_payment(payment.id).unwrap().remove(0);
    assert!(receipt.payed_at.is_none());

    let mut receipt = receipt;
    receipt.status = ReceiptStatus::Confirmed;
    let receipt = h.manager.save_receipt(receipt).unwrap();
    let stamped = receipt.payed_at.expect("status change stamps payed_at");

    let receipt = h.manager.save_receipt(receipt).unwrap();
    assert_eq!(receipt.payed_at, Some(stamped));
}
