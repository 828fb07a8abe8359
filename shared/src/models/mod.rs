//! Domain entities of the order management core
//!
//! Plain serde-serializable structs; all persistence and lifecycle behavior
//! lives in `oms-server`. Ownership is strictly tree-shaped: a basket owns
//! its items, an order owns its basket (post-creation), payments, deliveries,
//! comments and returns, a delivery owns its shipments, a shipment owns its
//! items and packages.

pub mod basket;
pub mod delivery;
pub mod history;
pub mod order;
pub mod payment;
pub mod types;

pub use basket::{Basket, BasketItem};
pub use delivery::{Delivery, Shipment, ShipmentItem, ShipmentPackage, ShipmentPackageItem};
pub use history::HistoryRecord;
pub use order::{Order, OrderComment, OrderReturn, OrderReturnItem};
pub use payment::{Payment, PaymentData, PaymentReceipt};
pub use types::*;
