//! Order comment observer: comments are audit events themselves.

use super::EntityObserver;
use crate::error::{OmsError, OmsResult};
use crate::store::StoreError;
use crate::uow::UnitOfWork;
use shared::models::{HistoryEntity, HistoryType, OrderComment};

pub struct CommentObserver;

impl EntityObserver<OrderComment> for CommentObserver {
    fn saving(
        &self,
        _uow: &mut UnitOfWork,
        new: &mut OrderComment,
        old: Option<&OrderComment>,
    ) -> OmsResult<()> {
        if let Some(old) = old {
            if new.order_id != old.order_id {
                return Err(OmsError::InvalidOperation(format!(
                    "comment {} cannot move from order {} to order {}",
                    old.id, old.order_id, new.order_id
                )));
            }
        }
        Ok(())
    }

    fn created(&self, uow: &mut UnitOfWork, new: &OrderComment) -> OmsResult<()> {
        let payload = serde_json::to_value(new).map_err(StoreError::from)?;
        uow.record_history(
            new.order_id,
            HistoryType::Comment,
            HistoryEntity::Comment,
            new.id,
            payload,
        )
    }
}
