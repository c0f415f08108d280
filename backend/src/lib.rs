//! Store Inventory Valuation Platform - Backend Engine
//!
//! Multi-store retail/restaurant inventory reporting: system stock
//! quantities derived from physical counts plus subsequent purchases,
//! weighted-average and FIFO unit costs, monthly usage reconciliation,
//! and a rolling 13-month COGS / profit-estimate series.
//!
//! This crate is a library consumed by report-rendering code. Services
//! batch their ledger queries (one query per stage, never one per item)
//! and hand the materialized rows to the computation core in `shared`;
//! outputs are plain serializable records with no rendering dependency.

pub mod config;
pub mod error;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
