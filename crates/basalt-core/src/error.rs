//! Error types.

use crate::driver::DriverError;
use crate::value::SqlValue;

/// A violation of the declared-schema invariants.
///
/// These are fatal: they abort a sync before any database I/O.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    /// The same table name is declared twice.
    #[error("duplicate table '{0}'")]
    DuplicateTable(String),

    /// The same field name appears twice within one table.
    #[error("duplicate field '{table}.{field}'")]
    DuplicateField {
        /// Table containing the duplicate.
        table: String,
        /// The duplicated field name.
        field: String,
    },

    /// More than one field of a table is marked as the primary key.
    #[error("table '{0}' declares more than one primary key")]
    MultiplePrimaryKeys(String),

    /// A primary-key field is declared nullable.
    #[error("primary key '{table}.{field}' must not be nullable")]
    NullablePrimaryKey {
        /// Table containing the field.
        table: String,
        /// The offending field.
        field: String,
    },

    /// A serial field carries a modifier it must not declare.
    #[error("serial field '{table}.{field}' must not declare '{modifier}'")]
    SerialModifier {
        /// Table containing the field.
        table: String,
        /// The offending field.
        field: String,
        /// The forbidden modifier (`nullable` or `unique`).
        modifier: &'static str,
    },

    /// A reference points at a table or field that is not declared.
    #[error("reference target '{target_table}.{target_field}' of '{table}.{field}' is not declared")]
    UnknownReferenceTarget {
        /// Referencing table.
        table: String,
        /// Referencing field.
        field: String,
        /// Referenced table.
        target_table: String,
        /// Referenced field.
        target_field: String,
    },

    /// A reference points at a field that is not a primary key.
    #[error("reference target '{target_table}.{target_field}' of '{table}.{field}' is not a primary key")]
    ReferenceNotPrimaryKey {
        /// Referencing table.
        table: String,
        /// Referencing field.
        field: String,
        /// Referenced table.
        target_table: String,
        /// Referenced field.
        target_field: String,
    },

    /// A reference crosses type classes.
    #[error("reference '{table}.{field}' and its target '{target_table}.{target_field}' have different type classes")]
    ReferenceClassMismatch {
        /// Referencing table.
        table: String,
        /// Referencing field.
        field: String,
        /// Referenced table.
        target_table: String,
        /// Referenced field.
        target_field: String,
    },

    /// A `one_of` value set is empty.
    #[error("'{table}.{field}' declares an empty value set")]
    EmptyOneOf {
        /// Table containing the field.
        table: String,
        /// The offending field.
        field: String,
    },

    /// An index is declared on a field that already gets one implicitly.
    #[error("index on '{table}.{field}' is implied by its other attributes")]
    RedundantIndex {
        /// Table containing the field.
        table: String,
        /// The offending field.
        field: String,
    },
}

/// Errors aborting a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The declared schema is invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A statement failed during introspection or probing.
    #[error("statement failed: {sql}: {source}")]
    Statement {
        /// The SQL that failed.
        sql: String,
        /// The driver-side error.
        source: DriverError,
    },
}

impl SyncError {
    pub(crate) fn statement(sql: impl Into<String>, source: DriverError) -> Self {
        Self::Statement {
            sql: sql.into(),
            source,
        }
    }
}

/// Errors surfaced by query execution.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The rendered statement failed at the driver.
    #[error("query failed: {sql}: {source}")]
    Statement {
        /// The SQL that failed.
        sql: String,
        /// The driver-side error.
        source: DriverError,
    },

    /// A result cell did not match the projection's declared shape.
    #[error("column '{label}' expected {expected}, got {value:?}")]
    Decode {
        /// The projection label.
        label: String,
        /// The expected decoded type.
        expected: &'static str,
        /// The value the driver returned.
        value: SqlValue,
    },

    /// A result row had a different arity than the projection.
    #[error("row has {actual} columns, projection has {expected}")]
    RowShape {
        /// Columns in the projection.
        expected: usize,
        /// Columns in the returned row.
        actual: usize,
    },
}
