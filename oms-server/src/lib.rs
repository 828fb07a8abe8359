//! Order management engine
//!
//! The core of a marketplace OMS: baskets, orders, deliveries, shipments,
//! payments and fiscal receipts, kept mutually consistent by an explicit
//! observer-dispatch cascade running inside one redb transaction per
//! operation. External collaborators (SMS, search index, marketing, payment
//! gateways, credit providers) are reached through capability traits; hosts
//! wire real adapters, tests wire recording mocks.
//!
//! Entry point: build an [`store::EntityStore`], an
//! [`observers::ObserverRegistry`] (usually `standard()`), a
//! [`capabilities::CapabilitySet`] plus provider registries, and hand them to
//! [`manager::OmsManager`].

pub mod capabilities;
pub mod credit;
pub mod engine;
pub mod error;
pub mod logger;
pub mod manager;
pub mod money;
pub mod notify;
pub mod observers;
pub mod store;
pub mod uow;

pub use error::{OmsError, OmsResult};
pub use manager::OmsManager;
