//! Domain models for the Store Inventory Valuation Platform

mod item;
mod purchase;
mod stock_count;

pub use item::*;
pub use purchase::*;
pub use stock_count::*;
