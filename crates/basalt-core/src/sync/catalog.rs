//! Catalog introspection.
//!
//! Issues the fixed pg_catalog queries against one named schema and
//! normalizes the rows into flat vectors that the diff engine walks
//! with linear-search helpers. No filtering happens here beyond what
//! the queries express.

use crate::driver::{Driver, Row};
use crate::error::SyncError;
use crate::value::SqlValue;

/// Lists every schema by name.
pub const SCHEMA_LIST_SQL: &str = "select nspname from pg_catalog.pg_namespace";

/// Per-column shape of one schema's ordinary tables.
pub const COLUMNS_SQL: &str = "\
select n.nspname, c.relname, a.attname, t.typname, a.attnotnull, a.atthasdef, a.attisdropped, \
pg_catalog.pg_get_expr(d.adbin, d.adrelid) as adbin_sql \
from pg_catalog.pg_namespace n \
join pg_catalog.pg_class c on c.relnamespace = n.oid \
join pg_catalog.pg_attribute a on a.attrelid = c.oid \
join pg_catalog.pg_type t on t.oid = a.atttypid \
left join pg_catalog.pg_attrdef d on d.adrelid = c.oid and d.adnum = a.attnum \
where c.relkind = 'r' and a.attnum > 0 and n.nspname = $1 \
order by c.relname, a.attname";

/// Primary/foreign/unique/check constraints of one schema.
pub const CONSTRAINTS_SQL: &str = "\
select con.contype::text, con.conname, c.relname, \
(select array_agg(a.attname) from pg_catalog.pg_attribute a \
 where a.attrelid = con.conrelid and a.attnum = any (con.conkey))::text as conkey_names, \
cf.relname as ref_relname, \
(select array_agg(a.attname) from pg_catalog.pg_attribute a \
 where a.attrelid = con.confrelid and a.attnum = any (con.confkey))::text as confkey_names, \
con.confupdtype::text, con.confdeltype::text, \
pg_catalog.pg_get_constraintdef(con.oid) as definition \
from pg_catalog.pg_namespace n \
join pg_catalog.pg_constraint con on con.connamespace = n.oid \
join pg_catalog.pg_class c on c.oid = con.conrelid \
left join pg_catalog.pg_class cf on cf.oid = con.confrelid \
where con.contype in ('p', 'f', 'u', 'c') and n.nspname = $1 \
order by c.relname, con.conname";

/// B-tree indexes of one schema.
pub const BTREE_INDEXES_SQL: &str = "\
select ic.relname as idxname, tc.relname, \
(select array_agg(a.attname) from pg_catalog.pg_attribute a \
 where a.attrelid = i.indrelid and a.attnum = any (i.indkey))::text as column_names \
from pg_catalog.pg_index i \
join pg_catalog.pg_class ic on ic.oid = i.indexrelid \
join pg_catalog.pg_class tc on tc.oid = i.indrelid \
join pg_catalog.pg_namespace n on n.oid = tc.relnamespace \
join pg_catalog.pg_am am on am.oid = ic.relam \
where am.amname = 'btree' and n.nspname = $1 \
order by tc.relname, ic.relname";

/// One column of one table, as the catalog reports it.
#[derive(Debug, Clone)]
pub struct ColumnRow {
    /// Schema name.
    pub schema: String,
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Physical type name (`typname`).
    pub data_type: String,
    /// Whether NOT NULL is set.
    pub not_null: bool,
    /// Whether the column has a default expression.
    pub has_default: bool,
    /// Whether the column has been dropped.
    pub is_dropped: bool,
    /// The default expression, decompiled.
    pub default_expr: Option<String>,
}

/// One constraint, as the catalog reports it.
#[derive(Debug, Clone)]
pub struct ConstraintRow {
    /// `p`, `f`, `u` or `c`.
    pub constraint_type: char,
    /// Constraint name.
    pub name: String,
    /// Constrained table.
    pub table: String,
    /// Constrained columns.
    pub columns: Vec<String>,
    /// Referenced table, for foreign keys.
    pub ref_table: Option<String>,
    /// Referenced columns, for foreign keys.
    pub ref_columns: Vec<String>,
    /// On-update action code, for foreign keys.
    pub on_update: char,
    /// On-delete action code, for foreign keys.
    pub on_delete: char,
    /// Decompiled constraint definition.
    pub definition: String,
}

/// One b-tree index, as the catalog reports it.
#[derive(Debug, Clone)]
pub struct IndexRow {
    /// Index name.
    pub name: String,
    /// Indexed table.
    pub table: String,
    /// Indexed columns.
    pub columns: Vec<String>,
}

/// A snapshot of one schema's state.
#[derive(Debug, Clone, Default)]
pub struct DbState {
    /// Whether the schema exists at all.
    pub schema_exists: bool,
    /// Column rows, in catalog order.
    pub columns: Vec<ColumnRow>,
    /// Constraint rows, in catalog order.
    pub constraints: Vec<ConstraintRow>,
    /// Index rows, in catalog order.
    pub indexes: Vec<IndexRow>,
}

impl DbState {
    /// The live (non-dropped) columns of a table.
    pub fn table_columns(&self, table: &str) -> Vec<&ColumnRow> {
        self.columns
            .iter()
            .filter(|c| c.table == table && !c.is_dropped)
            .collect()
    }

    /// Looks up one live column.
    #[must_use]
    pub fn column(&self, table: &str, column: &str) -> Option<&ColumnRow> {
        self.columns
            .iter()
            .find(|c| c.table == table && c.column == column && !c.is_dropped)
    }

    /// Finds a single-column constraint of the given type on
    /// `table.field`.
    #[must_use]
    pub fn constraint_on(
        &self,
        constraint_type: char,
        table: &str,
        field: &str,
    ) -> Option<&ConstraintRow> {
        self.constraints.iter().find(|c| {
            c.constraint_type == constraint_type
                && c.table == table
                && c.columns.len() == 1
                && c.columns[0] == field
        })
    }

    /// Foreign keys whose referenced column is `table.field`.
    pub fn foreign_keys_referencing(&self, table: &str, field: &str) -> Vec<&ConstraintRow> {
        self.constraints
            .iter()
            .filter(|c| {
                c.constraint_type == 'f'
                    && c.ref_table.as_deref() == Some(table)
                    && c.ref_columns.len() == 1
                    && c.ref_columns[0] == field
            })
            .collect()
    }

    /// Finds a single-column b-tree index on `table.field`.
    #[must_use]
    pub fn index_on(&self, table: &str, field: &str) -> Option<&IndexRow> {
        self.indexes
            .iter()
            .find(|i| i.table == table && i.columns.len() == 1 && i.columns[0] == field)
    }

    /// Distinct table names present in the schema, in catalog order.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for c in &self.columns {
            if !names.contains(&c.table.as_str()) {
                names.push(c.table.as_str());
            }
        }
        names
    }
}

/// Reads the full state of `schema` through the driver.
///
/// Driver failures are fatal and carry the offending SQL.
pub async fn read_state<D>(driver: &D, schema: &str) -> Result<DbState, SyncError>
where
    D: Driver + ?Sized,
{
    let schemas = run(driver, SCHEMA_LIST_SQL, &[]).await?;
    let schema_exists = schemas
        .iter()
        .any(|row| text_at(row, 0).as_deref() == Some(schema));
    if !schema_exists {
        return Ok(DbState::default());
    }

    let params = [SqlValue::Text(schema.to_string())];

    let columns = run(driver, COLUMNS_SQL, &params)
        .await?
        .iter()
        .map(|row| ColumnRow {
            schema: text_at(row, 0).unwrap_or_default(),
            table: text_at(row, 1).unwrap_or_default(),
            column: text_at(row, 2).unwrap_or_default(),
            data_type: text_at(row, 3).unwrap_or_default(),
            not_null: bool_at(row, 4),
            has_default: bool_at(row, 5),
            is_dropped: bool_at(row, 6),
            default_expr: text_at(row, 7),
        })
        .collect();

    let constraints = run(driver, CONSTRAINTS_SQL, &params)
        .await?
        .iter()
        .map(|row| ConstraintRow {
            constraint_type: char_at(row, 0),
            name: text_at(row, 1).unwrap_or_default(),
            table: text_at(row, 2).unwrap_or_default(),
            columns: braced_list(text_at(row, 3).as_deref()),
            ref_table: text_at(row, 4),
            ref_columns: braced_list(text_at(row, 5).as_deref()),
            on_update: char_at(row, 6),
            on_delete: char_at(row, 7),
            definition: text_at(row, 8).unwrap_or_default(),
        })
        .collect();

    let indexes = run(driver, BTREE_INDEXES_SQL, &params)
        .await?
        .iter()
        .map(|row| IndexRow {
            name: text_at(row, 0).unwrap_or_default(),
            table: text_at(row, 1).unwrap_or_default(),
            columns: braced_list(text_at(row, 2).as_deref()),
        })
        .collect();

    Ok(DbState {
        schema_exists,
        columns,
        constraints,
        indexes,
    })
}

async fn run<D>(driver: &D, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, SyncError>
where
    D: Driver + ?Sized,
{
    driver
        .query(sql, params)
        .await
        .map(|output| output.rows)
        .map_err(|source| SyncError::statement(sql, source))
}

fn text_at(row: &Row, index: usize) -> Option<String> {
    match row.get(index) {
        Some(SqlValue::Text(s)) => Some(s.clone()),
        _ => None,
    }
}

fn bool_at(row: &Row, index: usize) -> bool {
    match row.get(index) {
        Some(SqlValue::Bool(b)) => *b,
        Some(SqlValue::Int(n)) => *n != 0,
        _ => false,
    }
}

fn char_at(row: &Row, index: usize) -> char {
    text_at(row, index)
        .and_then(|s| s.chars().next())
        .unwrap_or(' ')
}

/// Parses a PostgreSQL braced array literal (`{a,b}`) into a list.
fn braced_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let inner = raw
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .trim();
    if inner.is_empty() {
        return Vec::new();
    }
    inner
        .split(',')
        .map(|part| part.trim().trim_matches('"').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn braced_list_parsing() {
        assert_eq!(braced_list(Some("{user_id}")), vec!["user_id"]);
        assert_eq!(braced_list(Some("{a,b}")), vec!["a", "b"]);
        assert_eq!(braced_list(Some("{\"mixed Case\"}")), vec!["mixed Case"]);
        assert!(braced_list(Some("{}")).is_empty());
        assert!(braced_list(None).is_empty());
    }

    #[test]
    fn single_column_constraint_lookup_ignores_multi_column_keys() {
        let state = DbState {
            schema_exists: true,
            columns: vec![],
            constraints: vec![ConstraintRow {
                constraint_type: 'u',
                name: String::from("t_a_b_key"),
                table: String::from("t"),
                columns: vec![String::from("a"), String::from("b")],
                ref_table: None,
                ref_columns: vec![],
                on_update: ' ',
                on_delete: ' ',
                definition: String::from("UNIQUE (a, b)"),
            }],
            indexes: vec![],
        };
        // A multi-column key never matches a single-column lookup,
        // even though the braced text would contain "{a".
        assert!(state.constraint_on('u', "t", "a").is_none());
    }

    #[test]
    fn table_names_are_distinct_and_ordered() {
        let col = |table: &str, column: &str| ColumnRow {
            schema: String::from("app"),
            table: table.to_string(),
            column: column.to_string(),
            data_type: String::from("int8"),
            not_null: false,
            has_default: false,
            is_dropped: false,
            default_expr: None,
        };
        let state = DbState {
            schema_exists: true,
            columns: vec![col("a", "x"), col("a", "y"), col("b", "x")],
            constraints: vec![],
            indexes: vec![],
        };
        assert_eq!(state.table_names(), vec!["a", "b"]);
    }

    #[test]
    fn dropped_columns_are_invisible() {
        let state = DbState {
            schema_exists: true,
            columns: vec![ColumnRow {
                schema: String::from("app"),
                table: String::from("t"),
                column: String::from("ghost"),
                data_type: String::from("int8"),
                not_null: false,
                has_default: false,
                is_dropped: true,
                default_expr: None,
            }],
            constraints: vec![],
            indexes: vec![],
        };
        assert!(state.column("t", "ghost").is_none());
        assert!(state.table_columns("t").is_empty());
    }
}
