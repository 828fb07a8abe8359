//! Shipment observer
//!
//! The one precisely constrained transition: a shipment whose payment status
//! is the legacy "paid, requires approval" code, owned by a merchant whose
//! configuration demands approval, is forced into `Checking`. The correction
//! is written through the unobserved path so it settles in exactly one pass
//! instead of re-entering this hook.

use super::EntityObserver;
use crate::error::{OmsError, OmsResult};
use crate::uow::UnitOfWork;
use shared::models::{Shipment, ShipmentPaymentStatus, ShipmentStatus};
use tracing::debug;

pub struct ShipmentObserver;

impl EntityObserver<Shipment> for ShipmentObserver {
    fn saving(
        &self,
        _uow: &mut UnitOfWork,
        new: &mut Shipment,
        old: Option<&Shipment>,
    ) -> OmsResult<()> {
        if let Some(old) = old {
            if new.delivery_id != old.delivery_id {
                return Err(OmsError::InvalidOperation(format!(
                    "shipment {} cannot move from delivery {} to delivery {}",
                    old.id, old.delivery_id, new.delivery_id
                )));
            }
        }
        Ok(())
    }

    fn updated(&self, uow: &mut UnitOfWork, new: &Shipment, _old: &Shipment) -> OmsResult<()> {
        if new.payment_status != ShipmentPaymentStatus::PaidRequiresApproval {
            return Ok(());
        }
        let config = uow.caps().merchants.merchant_config(new.merchant_id)?;
        if !config.requires_approval {
            return Ok(());
        }
        if new.status != ShipmentStatus::Checking {
            debug!(shipment_id = new.id, merchant_id = new.merchant_id, "forcing shipment into checking");
        }
        let mut corrected = new.clone();
        corrected.status = ShipmentStatus::Checking;
        uow.persist_shipment_unobserved(&corrected)?;
        Ok(())
    }
}
