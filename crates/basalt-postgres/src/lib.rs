//! # basalt-postgres
//!
//! The sqlx-backed PostgreSQL [`Driver`] for basalt.
//!
//! ```rust,no_run
//! use basalt_core::{sync, Field, SyncOptions, Table};
//! use basalt_postgres::PgDriver;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = PgDriver::connect("postgres://localhost/app").await?;
//! let tables = vec![Table::new("users").field(Field::serial("id").primary_key())];
//! let result = sync(&driver, "app", &tables, &SyncOptions { fulfill: true }).await?;
//! assert!(result.fulfilled);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row as _, TypeInfo};

use basalt_core::{Driver, DriverError, QueryOutput, Row, SqlValue};

/// A [`Driver`] over a `sqlx` PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgDriver {
    pool: PgPool,
}

impl PgDriver {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given database URL.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        Ok(Self::new(PgPool::connect(url).await?))
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Driver for PgDriver {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput, DriverError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                SqlValue::Null => query.bind(Option::<String>::None),
                SqlValue::Bool(b) => query.bind(*b),
                SqlValue::Int(n) => query.bind(*n),
                SqlValue::Float(f) => query.bind(*f),
                SqlValue::Text(s) => query.bind(s.clone()),
            };
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DriverError::new(e.to_string()))?;

        let row_count = rows.len() as u64;
        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<Row>, DriverError>>()?;

        Ok(QueryOutput { rows, row_count })
    }
}

fn decode_row(row: &PgRow) -> Result<Row, DriverError> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| decode_cell(row, index, column.type_info().name()))
        .collect()
}

fn decode_cell(row: &PgRow, index: usize, type_name: &str) -> Result<SqlValue, DriverError> {
    let cell = match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .map(|v| v.map(SqlValue::Bool)),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| v.map(|n| SqlValue::Int(i64::from(n)))),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .map(|v| v.map(|n| SqlValue::Int(i64::from(n)))),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)
            .map(|v| v.map(SqlValue::Int)),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| v.map(|f| SqlValue::Float(f64::from(f)))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)
            .map(|v| v.map(SqlValue::Float)),
        // pg_catalog identifiers come back as NAME; single-byte
        // "char" columns are cast to text by the catalog queries.
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(index)
            .map(|v| v.map(SqlValue::Text)),
        other => {
            return Err(DriverError::new(format!(
                "unsupported column type '{other}' at index {index}"
            )))
        }
    };

    cell.map(|v| v.unwrap_or(SqlValue::Null))
        .map_err(|e| DriverError::new(e.to_string()))
}
