//! Order return observer
//!
//! Stamps `status_at` iff the status changed, before any other save-time
//! derivation. Refund amounts are computed by the manager after commit.

use super::EntityObserver;
use crate::error::{OmsError, OmsResult};
use crate::uow::UnitOfWork;
use chrono::Utc;
use shared::models::OrderReturn;

pub struct OrderReturnObserver;

impl EntityObserver<OrderReturn> for OrderReturnObserver {
    fn saving(
        &self,
        _uow: &mut UnitOfWork,
        new: &mut OrderReturn,
        old: Option<&OrderReturn>,
    ) -> OmsResult<()> {
        let Some(old) = old else {
            return Ok(());
        };
        if new.order_id != old.order_id {
            return Err(OmsError::InvalidOperation(format!(
                "return {} cannot move from order {} to order {}",
                old.id, old.order_id, new.order_id
            )));
        }
        if new.status != old.status {
            new.status_at = Some(Utc::now());
        } else {
            new.status_at = old.status_at;
        }
        Ok(())
    }
}
