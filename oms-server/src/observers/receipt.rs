//! Payment receipt observer
//!
//! A persisted receipt always carries a guid: assigned at creation when the
//! provider supplied none, and again defensively on any later save where it
//! is somehow still absent. Once set it is never reassigned. `payed_at`
//! follows the stamp-iff-status-changed rule.

use super::EntityObserver;
use crate::error::{OmsError, OmsResult};
use crate::uow::UnitOfWork;
use chrono::Utc;
use shared::models::PaymentReceipt;
use uuid::Uuid;

pub struct ReceiptObserver;

impl EntityObserver<PaymentReceipt> for ReceiptObserver {
    fn saving(
        &self,
        _uow: &mut UnitOfWork,
        new: &mut PaymentReceipt,
        old: Option<&PaymentReceipt>,
    ) -> OmsResult<()> {
        if let Some(old) = old {
            if new.payment_id != old.payment_id {
                return Err(OmsError::InvalidOperation(format!(
                    "receipt {} cannot move from payment {} to payment {}",
                    old.id, old.payment_id, new.payment_id
                )));
            }
            if let Some(guid) = &old.guid {
                new.guid = Some(guid.clone());
            }
            if new.status != old.status {
                new.payed_at = Some(Utc::now());
            } else {
                new.payed_at = old.payed_at;
            }
        }
        if new.guid.is_none() {
            new.guid = Some(Uuid::new_v4().to_string());
        }
        Ok(())
    }
}
