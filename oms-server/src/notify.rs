//! Notification dispatcher
//!
//! Stateless message formatting over the SMS capability. Every send is
//! fire-and-forget: a failed lookup or gateway error is logged and swallowed,
//! never surfaced to the triggering state change.

use crate::capabilities::CapabilitySet;
use crate::money;
use crate::store::EntityStore;
use shared::models::{Delivery, DeliveryMethod, Order};
use tracing::warn;

pub struct NotificationService {
    store: EntityStore,
    caps: CapabilitySet,
}

impl NotificationService {
    pub fn new(store: EntityStore, caps: CapabilitySet) -> Self {
        Self { store, caps }
    }

    fn send_to_customer(&self, customer_id: u64, message: &str) {
        let phone = match self.caps.customers.customer_phone(customer_id) {
            Ok(Some(phone)) => phone,
            Ok(None) => {
                warn!(customer_id, "no phone on file, notification skipped");
                return;
            }
            Err(err) => {
                warn!(customer_id, %err, "customer lookup failed, notification skipped");
                return;
            }
        };
        if let Err(err) = self.caps.sms.send(&[phone], message) {
            warn!(customer_id, %err, "sms send failed");
        }
    }

    /// "Order paid" confirmation.
    pub fn payed(&self, order: &Order) {
        let message = format!(
            "Your order {} has been paid. Total: {:.2}.",
            order.number, order.price
        );
        self.send_to_customer(order.customer_id, &message);
    }

    /// Dispatched notification with the shipment cost sum and the delivery
    /// window.
    pub fn delivery_shipped(&self, delivery: &Delivery) {
        let order = match self.store.load_order(delivery.order_id) {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(delivery_id = delivery.id, "order missing, notification skipped");
                return;
            }
            Err(err) => {
                warn!(delivery_id = delivery.id, %err, "order load failed, notification skipped");
                return;
            }
        };
        let cost = match self.store.load_shipments_for_delivery(delivery.id) {
            Ok(shipments) => money::sum(shipments.iter().map(|s| s.cost)),
            Err(err) => {
                warn!(delivery_id = delivery.id, %err, "shipment load failed, notification skipped");
                return;
            }
        };
        let mut message = format!("Your order {} is on its way. Delivery cost: {cost:.2}.", order.number);
        if let Some(date) = delivery.delivery_at {
            message.push_str(&format!(" Expected {}", date.format("%d.%m.%Y")));
            if let (Some(start), Some(end)) = (delivery.time_start, delivery.time_end) {
                message.push_str(&format!(
                    " between {} and {}",
                    start.format("%H:%M"),
                    end.format("%H:%M")
                ));
            }
            message.push('.');
        }
        self.send_to_customer(order.customer_id, &message);
    }

    /// Pickup-ready notification. Applies only to pickup deliveries; an
    /// unknown pickup point skips the message silently.
    pub fn delivery_ready_for_recipient(&self, delivery: &Delivery) {
        if delivery.delivery_method != DeliveryMethod::Pickup {
            return;
        }
        let Some(point_id) = delivery.point_id else {
            return;
        };
        let point = match self.caps.points.lookup(point_id) {
            Ok(Some(point)) => point,
            Ok(None) => return,
            Err(err) => {
                warn!(point_id, %err, "pickup point lookup failed, notification skipped");
                return;
            }
        };
        let order = match self.store.load_order(delivery.order_id) {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(delivery_id = delivery.id, "order missing, notification skipped");
                return;
            }
            Err(err) => {
                warn!(delivery_id = delivery.id, %err, "order load failed, notification skipped");
                return;
            }
        };
        let message = format!(
            "Your order {} is ready for pickup at {}. Opening hours: {}. Phone: {}.",
            order.number, point.address, point.timetable, point.phone
        );
        self.send_to_customer(order.customer_id, &message);
    }
}
