//! Purchase ledger models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::valuation::PurchaseLot;

/// A delivery recorded in the purchase ledger.
///
/// Records are immutable once created except for the `is_deleted` soft
/// delete flag. `amount` equals `quantity * unit_price` at insertion time;
/// valuation code recomputes the product from `quantity` and `unit_price`
/// and only trusts the stored `amount` for simple purchase-amount sums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: i64,
    pub store_id: i64,
    pub item_id: i64,
    pub delivery_date: NaiveDate,
    /// Delivered quantity, non-negative.
    pub quantity: i64,
    /// Unit price in whole yen, non-negative.
    pub unit_price: i64,
    /// Stored line total in whole yen.
    pub amount: i64,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl PurchaseRecord {
    /// View of this record as a valuation input lot.
    pub fn lot(&self) -> PurchaseLot {
        PurchaseLot {
            id: self.id,
            delivery_date: self.delivery_date,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}
