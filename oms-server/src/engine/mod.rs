//! Derivation engines: aggregate payment status, receipt/refund issuance and
//! shipment recalculation.

pub mod payment_status;
pub mod receipts;
pub mod shipments;
