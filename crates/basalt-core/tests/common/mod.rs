#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;

use basalt_core::sync::catalog::{
    BTREE_INDEXES_SQL, COLUMNS_SQL, CONSTRAINTS_SQL, SCHEMA_LIST_SQL,
};
use basalt_core::{Driver, DriverError, QueryOutput, Row, SqlValue};

fn text(s: &str) -> SqlValue {
    SqlValue::Text(String::from(s))
}

/// A scripted driver: canned catalog rows keyed by the fixed
/// introspection queries, substring-matched responses for probes and
/// selects, and a log of everything executed.
pub struct MockDriver {
    schema: String,
    schemas: Vec<String>,
    columns: Vec<Row>,
    constraints: Vec<Row>,
    indexes: Vec<Row>,
    scripted: Vec<(String, QueryOutput)>,
    fail_on: Vec<String>,
    executed: Mutex<Vec<String>>,
}

impl MockDriver {
    /// A driver for `schema`. The schema itself does not exist until
    /// [`with_schema`](Self::with_schema) adds it.
    pub fn new(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            schemas: vec![String::from("public"), String::from("pg_catalog")],
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            scripted: Vec::new(),
            fail_on: Vec::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_schema(mut self, name: &str) -> Self {
        self.schemas.push(name.to_string());
        self
    }

    /// Adds one catalog column row for the target schema.
    pub fn with_column(
        mut self,
        table: &str,
        column: &str,
        data_type: &str,
        not_null: bool,
        default_expr: Option<&str>,
    ) -> Self {
        self.columns.push(vec![
            text(&self.schema),
            text(table),
            text(column),
            text(data_type),
            SqlValue::Bool(not_null),
            SqlValue::Bool(default_expr.is_some()),
            SqlValue::Bool(false),
            default_expr.map_or(SqlValue::Null, text),
        ]);
        self
    }

    #[allow(clippy::too_many_arguments)]
    fn with_constraint(
        mut self,
        contype: &str,
        name: &str,
        table: &str,
        columns: &str,
        ref_table: Option<&str>,
        ref_columns: Option<&str>,
        on_update: char,
        on_delete: char,
        definition: &str,
    ) -> Self {
        self.constraints.push(vec![
            text(contype),
            text(name),
            text(table),
            text(columns),
            ref_table.map_or(SqlValue::Null, text),
            ref_columns.map_or(SqlValue::Null, text),
            text(&on_update.to_string()),
            text(&on_delete.to_string()),
            text(definition),
        ]);
        self
    }

    pub fn with_primary_key(self, table: &str, field: &str, name: &str) -> Self {
        let definition = format!("PRIMARY KEY ({field})");
        self.with_constraint(
            "p",
            name,
            table,
            &format!("{{{field}}}"),
            None,
            None,
            ' ',
            ' ',
            &definition,
        )
    }

    pub fn with_unique_key(self, table: &str, field: &str, name: &str) -> Self {
        let definition = format!("UNIQUE ({field})");
        self.with_constraint(
            "u",
            name,
            table,
            &format!("{{{field}}}"),
            None,
            None,
            ' ',
            ' ',
            &definition,
        )
    }

    pub fn with_check_key(self, table: &str, field: &str, name: &str, definition: &str) -> Self {
        self.with_constraint(
            "c",
            name,
            table,
            &format!("{{{field}}}"),
            None,
            None,
            ' ',
            ' ',
            definition,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_foreign_key(
        self,
        table: &str,
        field: &str,
        name: &str,
        ref_table: &str,
        ref_field: &str,
        on_update: char,
        on_delete: char,
    ) -> Self {
        let definition = format!("FOREIGN KEY ({field}) REFERENCES {ref_table}({ref_field})");
        self.with_constraint(
            "f",
            name,
            table,
            &format!("{{{field}}}"),
            Some(ref_table),
            Some(&format!("{{{ref_field}}}")),
            on_update,
            on_delete,
            &definition,
        )
    }

    pub fn with_index(mut self, table: &str, field: &str, name: &str) -> Self {
        self.indexes.push(vec![
            text(name),
            text(table),
            text(&format!("{{{field}}}")),
        ]);
        self
    }

    /// Responds with `output` to any statement containing `pattern`.
    pub fn respond(mut self, pattern: &str, output: QueryOutput) -> Self {
        self.scripted.push((pattern.to_string(), output));
        self
    }

    /// Fails any statement containing `pattern`.
    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.fail_on.push(pattern.to_string());
        self
    }

    /// Every statement run so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// The executed statements matching a substring, in order.
    pub fn executed_matching(&self, pattern: &str) -> Vec<String> {
        self.executed()
            .into_iter()
            .filter(|sql| sql.contains(pattern))
            .collect()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutput, DriverError> {
        self.executed.lock().unwrap().push(sql.to_string());

        if self.fail_on.iter().any(|pattern| sql.contains(pattern)) {
            return Err(DriverError::new(format!("forced failure: {sql}")));
        }

        if sql == SCHEMA_LIST_SQL {
            let rows = self.schemas.iter().map(|s| vec![text(s)]).collect();
            return Ok(QueryOutput::with_rows(rows));
        }
        if sql == COLUMNS_SQL {
            assert_eq!(params, &[text(&self.schema)], "columns query params");
            return Ok(QueryOutput::with_rows(self.columns.clone()));
        }
        if sql == CONSTRAINTS_SQL {
            return Ok(QueryOutput::with_rows(self.constraints.clone()));
        }
        if sql == BTREE_INDEXES_SQL {
            return Ok(QueryOutput::with_rows(self.indexes.clone()));
        }

        for (pattern, output) in &self.scripted {
            if sql.contains(pattern) {
                return Ok(output.clone());
            }
        }

        // DDL and unmatched probes succeed with no rows.
        Ok(QueryOutput::empty())
    }
}

/// A probe result with one placeholder row.
pub fn one_row() -> QueryOutput {
    QueryOutput::with_rows(vec![vec![SqlValue::Int(1)]])
}

/// A probe result with a single scalar cell.
pub fn scalar(value: SqlValue) -> QueryOutput {
    QueryOutput::with_rows(vec![vec![value]])
}
