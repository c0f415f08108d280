//! Stock count ledger models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::valuation::CountEntry;

/// A physical stock count event.
///
/// Events are append-only: never updated or deleted. Several events may
/// share a (store, item, count_date) key when a count is re-entered; the
/// latest inserted event (highest id) is "the" count for that date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCountEvent {
    pub id: i64,
    pub store_id: i64,
    pub item_id: i64,
    pub count_date: NaiveDate,
    /// Counted quantity, non-negative.
    pub counted_qty: i64,
    pub created_at: DateTime<Utc>,
}

impl StockCountEvent {
    /// View of this event as a valuation input entry.
    pub fn entry(&self) -> CountEntry {
        CountEntry {
            id: self.id,
            count_date: self.count_date,
            counted_qty: self.counted_qty,
        }
    }
}
