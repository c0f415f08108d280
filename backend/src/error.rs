//! Error handling for the Store Inventory Valuation Platform
//!
//! Missing ledger data is never an error: no purchases resolves to zero
//! quantity and cost, no counts to a zero opening, no profit setting to an
//! absent estimate. Errors here mean the computation itself failed and the
//! whole report is aborted; partial results are never returned.

use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    /// A collaborator query failed; propagated as a hard failure of the
    /// whole report computation, with no retries.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for services
pub type AppResult<T> = Result<T, AppError>;
