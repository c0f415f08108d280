//! Item and supplier master models

use serde::{Deserialize, Serialize};

/// An item from the store-agnostic item master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub supplier_id: Option<i64>,
    /// In-house prepared goods participate in stock counts and valuation
    /// but carry no obligatory purchase history.
    pub is_internal: bool,
}

/// A supplier from the supplier master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: i64,
    pub code: String,
    pub name: String,
}
