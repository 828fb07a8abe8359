//! Engine-level error types
//!
//! `StoreError` covers persistence failures (wrapped redb and serde errors),
//! `OmsError` is the domain-facing taxonomy returned by every public
//! operation. Best-effort side effects never surface here — their failures
//! are logged and swallowed by the effect runner.

use crate::capabilities::CapabilityError;
use crate::store::StoreError;
use shared::models::{CreditSystem, PaymentSystem};
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum OmsError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("order not found: {0}")]
    OrderNotFound(u64),

    #[error("basket not found: {0}")]
    BasketNotFound(u64),

    #[error("basket item not found: {0}")]
    BasketItemNotFound(u64),

    #[error("payment not found: {0}")]
    PaymentNotFound(u64),

    #[error("delivery not found: {0}")]
    DeliveryNotFound(u64),

    #[error("shipment not found: {0}")]
    ShipmentNotFound(u64),

    #[error("order return not found: {0}")]
    ReturnNotFound(u64),

    #[error("basket {0} already belongs to an order")]
    BasketAlreadyOrdered(u64),

    #[error("payment {0} has already been started")]
    PaymentAlreadyStarted(u64),

    #[error("no payment provider registered for {0:?}")]
    ProviderNotRegistered(PaymentSystem),

    #[error("no credit provider registered for {0:?}")]
    CreditProviderNotRegistered(CreditSystem),

    #[error("order {0} has no credit system assigned")]
    NoCreditSystem(u64),

    /// Critical-path external capability failure (receipt issuance, refund,
    /// payment start). Propagated so the caller can retry.
    #[error("capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

pub type OmsResult<T> = Result<T, OmsError>;
