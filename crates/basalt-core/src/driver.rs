//! The database driver capability.
//!
//! The core crate defines only the trait so it stays driver-agnostic;
//! concrete implementations live in driver crates (basalt-postgres) or
//! in test fixtures.

use async_trait::async_trait;

use crate::value::SqlValue;

/// One result row, positional, in projection order.
pub type Row = Vec<SqlValue>;

/// The result of a driver round-trip.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    /// Result rows.
    pub rows: Vec<Row>,
    /// Number of rows returned.
    pub row_count: u64,
}

impl QueryOutput {
    /// An empty result.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A result containing the given rows.
    #[must_use]
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let row_count = rows.len() as u64;
        Self { rows, row_count }
    }
}

/// An error produced by the underlying database driver.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
}

impl DriverError {
    /// Wraps a driver-side failure.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A capability for running SQL against a live database.
///
/// Statements may use `$1`-style positional parameters, bound from
/// `params` in order. The connection behind the driver is an opaque
/// resource owned by the caller; no pooling or retry happens here.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Runs a single statement and returns its rows.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput, DriverError>;
}
