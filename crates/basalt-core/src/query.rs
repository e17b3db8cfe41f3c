//! The fluent SELECT builder.
//!
//! A query grows through fixed stages: `from` seeds the scope, `join`
//! extends it, `select` fixes the result-row shape, then optionally
//! `where_clause` and `order_by`, and finally `sql`/`exec`. Typestate
//! markers make out-of-order calls fail to compile: there is no
//! `where_clause` after `order_by` and no second `where_clause`.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::driver::Driver;
use crate::error::QueryError;
use crate::expr::{
    BoolExpr, DoubleExpr, FieldExpr, IntExpr, OrderTerm, Selected, StringExpr, TypeTag,
};
use crate::schema::{Field, FieldType, Table};
use crate::value::SqlValue;

/// Paging options for `exec`.
///
/// When `page_size` is unset no limit clause is rendered; `page_index`
/// defaults to the first page.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecOptions {
    /// Rows per page.
    pub page_size: Option<u64>,
    /// Zero-based page number.
    pub page_index: Option<u64>,
}

/// The set of alias-qualified columns visible to `join`, `select`,
/// `where_clause` and `order_by` callbacks.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    aliases: BTreeMap<String, BTreeMap<String, FieldExpr>>,
}

impl Scope {
    fn bind(&mut self, alias: &str, table: &Table) {
        let fields = table
            .fields
            .iter()
            .map(|f| (f.name.clone(), field_expr(alias, f)))
            .collect();
        self.aliases.insert(alias.to_string(), fields);
    }

    /// The column expression for `alias."name"`.
    ///
    /// # Panics
    ///
    /// Panics when the alias or field is not in scope; referencing an
    /// out-of-scope column is a construction-time failure.
    #[must_use]
    #[track_caller]
    pub fn field(&self, alias: &str, name: &str) -> FieldExpr {
        let Some(fields) = self.aliases.get(alias) else {
            panic!("alias '{alias}' is not in scope");
        };
        match fields.get(name) {
            Some(expr) => expr.clone(),
            None => panic!("field '{alias}.{name}' is not in scope"),
        }
    }

    /// The column as an integer expression.
    ///
    /// # Panics
    ///
    /// Panics when the column is out of scope or not integer-typed.
    #[must_use]
    #[track_caller]
    pub fn integer(&self, alias: &str, name: &str) -> IntExpr {
        self.field(alias, name).integer()
    }

    /// The column as a double expression.
    ///
    /// # Panics
    ///
    /// Panics when the column is out of scope or not double-typed.
    #[must_use]
    #[track_caller]
    pub fn double(&self, alias: &str, name: &str) -> DoubleExpr {
        self.field(alias, name).double()
    }

    /// The column as a string expression.
    ///
    /// # Panics
    ///
    /// Panics when the column is out of scope or not string-typed.
    #[must_use]
    #[track_caller]
    pub fn string(&self, alias: &str, name: &str) -> StringExpr {
        self.field(alias, name).string()
    }
}

/// Maps a declared field to its typed column expression. Serial fields
/// are integer-tagged and never nullable.
fn field_expr(alias: &str, field: &Field) -> FieldExpr {
    match field.field_type {
        FieldType::Serial => FieldExpr::Integer(IntExpr::column(alias, &field.name, false)),
        FieldType::Integer => {
            FieldExpr::Integer(IntExpr::column(alias, &field.name, field.is_nullable()))
        }
        FieldType::Double => {
            FieldExpr::Double(DoubleExpr::column(alias, &field.name, field.is_nullable()))
        }
        FieldType::String => {
            FieldExpr::String(StringExpr::column(alias, &field.name, field.is_nullable()))
        }
    }
}

/// One or more ordering terms, so `order_by` accepts a single
/// expression as well as an ordered list.
pub trait IntoOrderBy {
    /// The ordering terms, in order.
    fn into_terms(self) -> Vec<OrderTerm>;
}

impl IntoOrderBy for Vec<OrderTerm> {
    fn into_terms(self) -> Vec<OrderTerm> {
        self
    }
}

macro_rules! impl_into_order_by {
    ($($ty:ty),+) => {
        $(impl IntoOrderBy for $ty {
            fn into_terms(self) -> Vec<OrderTerm> {
                vec![self.into()]
            }
        })+
    };
}

impl_into_order_by!(
    OrderTerm,
    FieldExpr,
    crate::expr::GenericExpr,
    BoolExpr,
    IntExpr,
    DoubleExpr,
    StringExpr
);

#[derive(Debug, Clone)]
struct JoinClause {
    table: String,
    alias: String,
    on: BoolExpr,
}

#[derive(Debug, Clone)]
struct QueryContext {
    from_table: String,
    from_alias: String,
    joins: Vec<JoinClause>,
    scope: Scope,
    projection: Vec<(String, Selected)>,
    filter: Option<BoolExpr>,
    order: Vec<OrderTerm>,
}

/// Starts a new query.
#[must_use]
pub fn query() -> Query {
    Query
}

/// The entry stage; only `from` is available.
#[derive(Debug, Clone, Copy)]
pub struct Query;

impl Query {
    /// Seeds the scope with the table's fields under `alias`.
    #[must_use]
    pub fn from(self, table: &Table, alias: &str) -> QueryBuilder {
        let mut scope = Scope::default();
        scope.bind(alias, table);
        QueryBuilder {
            ctx: QueryContext {
                from_table: table.name.clone(),
                from_alias: alias.to_string(),
                joins: Vec::new(),
                scope,
                projection: Vec::new(),
                filter: None,
                order: Vec::new(),
            },
        }
    }
}

/// The stage after `from`: joins may be chained, then `select` fixes
/// the projection.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    ctx: QueryContext,
}

impl QueryBuilder {
    /// Joins another table under a new alias.
    ///
    /// The callback sees the extended scope (including the new alias)
    /// and returns the join condition.
    #[must_use]
    pub fn join<F>(mut self, table: &Table, alias: &str, on: F) -> Self
    where
        F: FnOnce(&Scope) -> BoolExpr,
    {
        self.ctx.scope.bind(alias, table);
        let condition = on(&self.ctx.scope);
        self.ctx.joins.push(JoinClause {
            table: table.name.clone(),
            alias: alias.to_string(),
            on: condition,
        });
        self
    }

    /// Fixes the projection: an ordered list of `label -> expression`.
    ///
    /// Each column's decoded type follows the expression's tag.
    #[must_use]
    pub fn select<F>(mut self, f: F) -> SelectQuery<NoFilter, Unordered>
    where
        F: FnOnce(&Scope) -> Vec<(&'static str, Selected)>,
    {
        self.ctx.projection = f(&self.ctx.scope)
            .into_iter()
            .map(|(label, selected)| (label.to_string(), selected))
            .collect();
        SelectQuery {
            ctx: self.ctx,
            _stage: PhantomData,
        }
    }
}

/// Marker: no filter yet.
pub struct NoFilter;
/// Marker: a filter has been set.
pub struct Filtered;
/// Marker: no ordering yet.
pub struct Unordered;
/// Marker: an ordering has been set.
pub struct Ordered;

/// The stage after `select`; renderable and executable.
#[derive(Debug, Clone)]
pub struct SelectQuery<W, O> {
    ctx: QueryContext,
    _stage: PhantomData<(W, O)>,
}

impl SelectQuery<NoFilter, Unordered> {
    /// Sets the filter. At most one per query, and only before
    /// `order_by`.
    #[must_use]
    pub fn where_clause<F>(mut self, f: F) -> SelectQuery<Filtered, Unordered>
    where
        F: FnOnce(&Scope) -> BoolExpr,
    {
        self.ctx.filter = Some(f(&self.ctx.scope));
        SelectQuery {
            ctx: self.ctx,
            _stage: PhantomData,
        }
    }
}

impl<W> SelectQuery<W, Unordered> {
    /// Sets the ordering: a single term or an ordered list.
    /// Descending order requires wrapping the term with `desc()`.
    #[must_use]
    pub fn order_by<F, T>(mut self, f: F) -> SelectQuery<W, Ordered>
    where
        F: FnOnce(&Scope) -> T,
        T: IntoOrderBy,
    {
        self.ctx.order = f(&self.ctx.scope).into_terms();
        SelectQuery {
            ctx: self.ctx,
            _stage: PhantomData,
        }
    }
}

impl<W, O> SelectQuery<W, O> {
    /// Renders the SQL for this query.
    #[must_use]
    pub fn sql(&self, options: &ExecOptions) -> String {
        let ctx = &self.ctx;
        let mut sql = String::from("select ");

        let projection: Vec<String> = ctx
            .projection
            .iter()
            .map(|(label, selected)| format!("{} as \"{label}\"", selected.sql()))
            .collect();
        sql.push_str(&projection.join(", "));

        sql.push_str(&format!(
            " from \"{}\" {}",
            ctx.from_table, ctx.from_alias
        ));

        for join in &ctx.joins {
            sql.push_str(&format!(
                " join \"{}\" {} on {}",
                join.table,
                join.alias,
                join.on.sql()
            ));
        }

        if let Some(filter) = &ctx.filter {
            sql.push_str(&format!(" where {}", filter.sql()));
        }

        if !ctx.order.is_empty() {
            let terms: Vec<&str> = ctx.order.iter().map(OrderTerm::sql).collect();
            sql.push_str(&format!(" order by {}", terms.join(", ")));
        }

        if let Some(size) = options.page_size {
            let index = options.page_index.unwrap_or(0);
            sql.push_str(&format!(" limit {size} offset {}", index * size));
        }

        sql
    }

    /// Renders the query, runs it through the driver and decodes the
    /// rows per the projection's type tags.
    ///
    /// Driver errors surface unchanged, wrapped with the offending SQL.
    pub async fn exec<D>(
        &self,
        driver: &D,
        options: &ExecOptions,
    ) -> Result<Vec<QueryRow>, QueryError>
    where
        D: Driver + ?Sized,
    {
        let sql = self.sql(options);
        let output = driver
            .query(&sql, &[])
            .await
            .map_err(|source| QueryError::Statement {
                sql: sql.clone(),
                source,
            })?;

        output
            .rows
            .into_iter()
            .map(|row| decode_row(&self.ctx.projection, row))
            .collect()
    }
}

fn decode_row(
    projection: &[(String, Selected)],
    row: Vec<SqlValue>,
) -> Result<QueryRow, QueryError> {
    if row.len() != projection.len() {
        return Err(QueryError::RowShape {
            expected: projection.len(),
            actual: row.len(),
        });
    }

    let mut values = Vec::with_capacity(row.len());
    for ((label, selected), value) in projection.iter().zip(row) {
        check_cell(label, selected, &value)?;
        values.push((label.clone(), value));
    }
    Ok(QueryRow { values })
}

fn check_cell(label: &str, selected: &Selected, value: &SqlValue) -> Result<(), QueryError> {
    let mismatch = |expected: &'static str| QueryError::Decode {
        label: label.to_string(),
        expected,
        value: value.clone(),
    };
    match (selected.tag(), value) {
        (TypeTag::Generic, _) => Ok(()),
        (_, SqlValue::Null) if selected.is_nullable() => Ok(()),
        (TypeTag::Boolean, SqlValue::Bool(_)) => Ok(()),
        (TypeTag::Boolean, _) => Err(mismatch("boolean")),
        (TypeTag::Integer, SqlValue::Int(_)) => Ok(()),
        (TypeTag::Integer, _) => Err(mismatch("integer")),
        // Some drivers return whole doubles as integers.
        (TypeTag::Double, SqlValue::Float(_) | SqlValue::Int(_)) => Ok(()),
        (TypeTag::Double, _) => Err(mismatch("double")),
        (TypeTag::String, SqlValue::Text(_)) => Ok(()),
        (TypeTag::String, _) => Err(mismatch("string")),
    }
}

/// One decoded result row, keyed by projection label.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    values: Vec<(String, SqlValue)>,
}

impl QueryRow {
    /// The value under a projection label.
    #[must_use]
    pub fn value(&self, label: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v)
    }

    /// The integer under a label; `None` when NULL or absent.
    #[must_use]
    pub fn integer(&self, label: &str) -> Option<i64> {
        match self.value(label) {
            Some(SqlValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// The double under a label; `None` when NULL or absent.
    #[must_use]
    pub fn double(&self, label: &str) -> Option<f64> {
        match self.value(label) {
            Some(SqlValue::Float(f)) => Some(*f),
            Some(SqlValue::Int(n)) => Some(*n as f64),
            _ => None,
        }
    }

    /// The string under a label; `None` when NULL or absent.
    #[must_use]
    pub fn string(&self, label: &str) -> Option<&str> {
        match self.value(label) {
            Some(SqlValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The boolean under a label; `None` when NULL or absent.
    #[must_use]
    pub fn boolean(&self, label: &str) -> Option<bool> {
        match self.value(label) {
            Some(SqlValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}
