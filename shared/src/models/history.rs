//! Append-only audit history records

use super::types::{HistoryEntity, HistoryType, OrderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in the per-order audit trail.
///
/// `seq` is a store-global sequence number; the `(order_id, seq)` pair is the
/// storage key, so entries replay in the order they were recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    pub seq: u64,
    pub order_id: OrderId,
    pub history_type: HistoryType,
    pub entity: HistoryEntity,
    /// Id of the entity the record refers to.
    pub entity_id: u64,
    /// JSON snapshot of the entity at the time of the event.
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
