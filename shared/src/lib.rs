//! Shared types and valuation core for the Store Inventory Valuation Platform
//!
//! This crate contains the domain models and the storage-agnostic
//! computation core shared by the backend report services: period keys,
//! system-quantity derivation, unit-cost resolution (weighted average and
//! FIFO layers), monthly usage reconciliation, and profit estimation.
//! Everything here operates on already-materialized row sequences; the
//! backend crate owns the batched database queries that produce them.

pub mod cogs;
pub mod models;
pub mod period;
pub mod profit;
pub mod usage;
pub mod valuation;

pub use models::*;
pub use period::MonthKey;
