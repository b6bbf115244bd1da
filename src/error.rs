//! Error handling module
//!
//! Provides the unified error type for the grid editor core. Nothing in this
//! crate is fatal: panel flows catch lookup misses, log them, and degrade to
//! a no-op, while query failures are surfaced through the notification sink.

use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum GridError {
    #[error("table {0} not found in catalog snapshot")]
    TableNotFound(u32),

    #[error("column {column} not found in table {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("unsupported entity shape: {0}")]
    UnsupportedEntity(String),

    #[error("query execution failed: {0}")]
    QueryExecution(String),

    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias used throughout the crate
pub type GridResult<T> = Result<T, GridError>;
