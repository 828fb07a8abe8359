//! Payment observer
//!
//! `payed_at` stamps on the save where the status first becomes `Paid` and
//! never moves again. Every status change re-derives the owning order's
//! aggregate payment status. Receipt issuance runs after commit (see the
//! manager), never here.

use super::EntityObserver;
use crate::error::{OmsError, OmsResult};
use crate::uow::UnitOfWork;
use chrono::Utc;
use shared::models::{Payment, PaymentStatus};

pub struct PaymentObserver;

impl EntityObserver<Payment> for PaymentObserver {
    fn saving(
        &self,
        _uow: &mut UnitOfWork,
        new: &mut Payment,
        old: Option<&Payment>,
    ) -> OmsResult<()> {
        if let Some(old) = old {
            if new.order_id != old.order_id {
                return Err(OmsError::InvalidOperation(format!(
                    "payment {} cannot move from order {} to order {}",
                    old.id, old.order_id, new.order_id
                )));
            }
            // payed_at is write-once
            if old.payed_at.is_some() {
                new.payed_at = old.payed_at;
                return Ok(());
            }
        }
        if new.status == PaymentStatus::Paid && new.payed_at.is_none() {
            new.payed_at = Some(Utc::now());
        }
        Ok(())
    }

    fn created(&self, uow: &mut UnitOfWork, new: &Payment) -> OmsResult<()> {
        uow.refresh_payment_status(new.order_id)
    }

    fn updated(&self, uow: &mut UnitOfWork, new: &Payment, old: &Payment) -> OmsResult<()> {
        if new.status != old.status {
            uow.refresh_payment_status(new.order_id)?;
        }
        Ok(())
    }
}
