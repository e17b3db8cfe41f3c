//! DDL generation for remediation actions.
//!
//! Pure string builders; each emitter returns the ordered list of
//! statements an issue needs (mismatches emit drop + create pairs).
//! Identifiers are double-quoted, literals are formatted per the
//! field's logical type.

use crate::schema::{Field, FieldReference, FieldType, Table};
use crate::types::to_physical;
use crate::value::quote_literal;

/// Double-quotes an identifier.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

/// Renders `"schema"."table"`.
#[must_use]
pub fn qualified(schema: &str, table: &str) -> String {
    format!("\"{schema}\".\"{table}\"")
}

/// Formats a textual literal according to the field's type: strings
/// are quoted, numerics stay raw.
#[must_use]
pub fn format_literal(field_type: FieldType, raw: &str) -> String {
    match field_type {
        FieldType::String => quote_literal(raw),
        _ => raw.to_string(),
    }
}

/// The column clause of a field: name, physical type, nullability and
/// default. Keys and indexes are separate statements.
fn column_definition(field: &Field) -> String {
    let mut sql = format!(
        "{} {}",
        quote_ident(&field.name),
        to_physical(field.field_type)
    );
    if field.field_type != FieldType::Serial && !field.is_nullable() {
        sql.push_str(" not null");
    }
    if let Some(default) = &field.default_value {
        sql.push_str(" default ");
        sql.push_str(&format_literal(field.field_type, default));
    }
    sql
}

/// `create schema "s"`.
#[must_use]
pub fn create_schema(schema: &str) -> Vec<String> {
    vec![format!("create schema {}", quote_ident(schema))]
}

/// `create table "s"."t" (…)`, column shapes only.
#[must_use]
pub fn create_table(schema: &str, table: &Table) -> Vec<String> {
    let columns: Vec<String> = table.fields.iter().map(column_definition).collect();
    vec![format!(
        "create table {} ({})",
        qualified(schema, &table.name),
        columns.join(", ")
    )]
}

/// `alter table … add column …`.
#[must_use]
pub fn add_column(schema: &str, table: &str, field: &Field) -> Vec<String> {
    vec![format!(
        "alter table {} add column {}",
        qualified(schema, table),
        column_definition(field)
    )]
}

/// `alter table … alter column … type …`.
#[must_use]
pub fn alter_column_type(schema: &str, table: &str, field: &Field) -> Vec<String> {
    vec![format!(
        "alter table {} alter column {} type {}",
        qualified(schema, table),
        quote_ident(&field.name),
        to_physical(field.field_type)
    )]
}

/// `alter table … alter column … set not null` or `drop not null`.
#[must_use]
pub fn alter_column_nullable(schema: &str, table: &str, field: &str, nullable: bool) -> Vec<String> {
    let clause = if nullable {
        "drop not null"
    } else {
        "set not null"
    };
    vec![format!(
        "alter table {} alter column {} {clause}",
        qualified(schema, table),
        quote_ident(field)
    )]
}

/// `alter table … alter column … set default …` or `drop default`.
#[must_use]
pub fn alter_column_default(schema: &str, table: &str, field: &Field) -> Vec<String> {
    let statement = match &field.default_value {
        Some(default) => format!(
            "alter table {} alter column {} set default {}",
            qualified(schema, table),
            quote_ident(&field.name),
            format_literal(field.field_type, default)
        ),
        None => format!(
            "alter table {} alter column {} drop default",
            qualified(schema, table),
            quote_ident(&field.name)
        ),
    };
    vec![statement]
}

/// `alter table … add primary key (…)`.
#[must_use]
pub fn add_primary_key(schema: &str, table: &str, field: &str) -> Vec<String> {
    vec![format!(
        "alter table {} add primary key ({})",
        qualified(schema, table),
        quote_ident(field)
    )]
}

/// `alter table … drop constraint …`.
#[must_use]
pub fn drop_constraint(schema: &str, table: &str, name: &str) -> Vec<String> {
    vec![format!(
        "alter table {} drop constraint {}",
        qualified(schema, table),
        quote_ident(name)
    )]
}

/// The foreign-key constraint name:
/// `<table>_<field>_<reftable>_<reffield>_fkey`.
#[must_use]
pub fn foreign_key_name(table: &str, field: &str, reference: &FieldReference) -> String {
    format!(
        "{table}_{field}_{}_{}_fkey",
        reference.table, reference.field
    )
}

/// `alter table … add constraint … foreign key … references …` with
/// the declared on-delete/on-update actions.
#[must_use]
pub fn add_foreign_key(
    schema: &str,
    table: &str,
    field: &str,
    reference: &FieldReference,
) -> Vec<String> {
    let mut sql = format!(
        "alter table {} add constraint {} foreign key ({}) references {} ({})",
        qualified(schema, table),
        quote_ident(&foreign_key_name(table, field, reference)),
        quote_ident(field),
        qualified(schema, &reference.table),
        quote_ident(&reference.field)
    );
    if let Some(action) = reference.on_delete {
        sql.push_str(" on delete ");
        sql.push_str(action.as_sql());
    }
    if let Some(action) = reference.on_update {
        sql.push_str(" on update ");
        sql.push_str(action.as_sql());
    }
    vec![sql]
}

/// `alter table … add constraint "<table>_<field>_unique" unique (…)`.
#[must_use]
pub fn add_unique(schema: &str, table: &str, field: &str) -> Vec<String> {
    vec![format!(
        "alter table {} add constraint {} unique ({})",
        qualified(schema, table),
        quote_ident(&format!("{table}_{field}_unique")),
        quote_ident(field)
    )]
}

/// `alter table … add constraint "<table>_<field>_check" check (… in (…))`.
#[must_use]
pub fn add_check(
    schema: &str,
    table: &str,
    field: &str,
    field_type: FieldType,
    values: &[String],
) -> Vec<String> {
    let literals: Vec<String> = values
        .iter()
        .map(|v| format_literal(field_type, v))
        .collect();
    vec![format!(
        "alter table {} add constraint {} check ({} in ({}))",
        qualified(schema, table),
        quote_ident(&format!("{table}_{field}_check")),
        quote_ident(field),
        literals.join(", ")
    )]
}

/// `create index "<table>_<field>_btree" on … using btree (…)`.
#[must_use]
pub fn create_index(schema: &str, table: &str, field: &str) -> Vec<String> {
    vec![format!(
        "create index {} on {} using btree ({})",
        quote_ident(&format!("{table}_{field}_btree")),
        qualified(schema, table),
        quote_ident(field)
    )]
}

/// `drop index "s"."name"`.
#[must_use]
pub fn drop_index(schema: &str, name: &str) -> Vec<String> {
    vec![format!("drop index {}", qualified(schema, name))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ReferenceAction;

    #[test]
    fn create_table_renders_column_shapes_only() {
        let table = Table::new("users")
            .field(Field::serial("id").primary_key())
            .field(Field::string("email").unique())
            .field(Field::integer("age").nullable().default_value("0"));
        let sql = &create_table("app", &table)[0];
        assert_eq!(
            sql,
            "create table \"app\".\"users\" (\"id\" bigserial, \
             \"email\" varchar not null, \"age\" bigint default 0)"
        );
        // Keys arrive as separate issues, never inline.
        assert!(!sql.contains("primary key"));
        assert!(!sql.contains("unique ("));
    }

    #[test]
    fn string_defaults_are_quoted() {
        let field = Field::string("status").default_value("new");
        let sql = &add_column("app", "orders", &field)[0];
        assert_eq!(
            sql,
            "alter table \"app\".\"orders\" add column \"status\" varchar not null default 'new'"
        );
    }

    #[test]
    fn nullable_toggles() {
        assert_eq!(
            alter_column_nullable("app", "t", "f", true)[0],
            "alter table \"app\".\"t\" alter column \"f\" drop not null"
        );
        assert_eq!(
            alter_column_nullable("app", "t", "f", false)[0],
            "alter table \"app\".\"t\" alter column \"f\" set not null"
        );
    }

    #[test]
    fn default_set_and_drop() {
        let with_default = Field::integer("n").default_value("5");
        assert_eq!(
            alter_column_default("app", "t", &with_default)[0],
            "alter table \"app\".\"t\" alter column \"n\" set default 5"
        );
        let without_default = Field::integer("n");
        assert_eq!(
            alter_column_default("app", "t", &without_default)[0],
            "alter table \"app\".\"t\" alter column \"n\" drop default"
        );
    }

    #[test]
    fn foreign_key_statement() {
        let reference = FieldReference::new("users", "id").on_delete(ReferenceAction::Cascade);
        let sql = &add_foreign_key("app", "orders", "user_id", &reference)[0];
        assert_eq!(
            sql,
            "alter table \"app\".\"orders\" add constraint \
             \"orders_user_id_users_id_fkey\" foreign key (\"user_id\") \
             references \"app\".\"users\" (\"id\") on delete cascade"
        );
    }

    #[test]
    fn constraint_name_templates() {
        assert_eq!(
            add_unique("app", "users", "email")[0],
            "alter table \"app\".\"users\" add constraint \"users_email_unique\" \
             unique (\"email\")"
        );
        let check = add_check(
            "app",
            "orders",
            "status",
            FieldType::String,
            &["a".to_string(), "b".to_string()],
        );
        assert_eq!(
            check[0],
            "alter table \"app\".\"orders\" add constraint \"orders_status_check\" \
             check (\"status\" in ('a', 'b'))"
        );
        assert_eq!(
            create_index("app", "users", "name")[0],
            "create index \"users_name_btree\" on \"app\".\"users\" using btree (\"name\")"
        );
    }

    #[test]
    fn numeric_check_literals_stay_raw() {
        let check = add_check(
            "app",
            "t",
            "n",
            FieldType::Integer,
            &["1".to_string(), "2".to_string()],
        );
        assert!(check[0].ends_with("check (\"n\" in (1, 2))"));
    }

    #[test]
    fn drop_statements() {
        assert_eq!(
            drop_constraint("app", "t", "t_f_unique")[0],
            "alter table \"app\".\"t\" drop constraint \"t_f_unique\""
        );
        assert_eq!(
            drop_index("app", "t_f_btree")[0],
            "drop index \"app\".\"t_f_btree\""
        );
    }
}
