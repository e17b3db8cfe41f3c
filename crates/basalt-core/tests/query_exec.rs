//! Query execution and row decoding against a scripted driver.

mod common;

use basalt_core::{query, ExecOptions, Field, QueryError, QueryOutput, SqlValue, Table};
use common::MockDriver;

fn users() -> Table {
    Table::new("users")
        .field(Field::serial("id").primary_key())
        .field(Field::string("email").unique())
        .field(Field::integer("age").nullable())
}

#[tokio::test]
async fn exec_decodes_rows_per_projection_tags() {
    let driver = MockDriver::new("app").respond(
        "from \"users\"",
        QueryOutput::with_rows(vec![
            vec![
                SqlValue::Text(String::from("a@example.com")),
                SqlValue::Int(40),
            ],
            vec![SqlValue::Text(String::from("b@example.com")), SqlValue::Null],
        ]),
    );

    let rows = query()
        .from(&users(), "u")
        .select(|s| {
            vec![
                ("email", s.field("u", "email").into()),
                ("age", s.field("u", "age").into()),
            ]
        })
        .order_by(|s| s.string("u", "email"))
        .exec(&driver, &ExecOptions::default())
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].string("email"), Some("a@example.com"));
    assert_eq!(rows[0].integer("age"), Some(40));
    assert_eq!(rows[1].integer("age"), None);
    assert_eq!(rows[1].value("age"), Some(&SqlValue::Null));

    // The driver saw the rendered statement.
    let executed = driver.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(
        executed[0],
        "select u.\"email\" as \"email\", u.\"age\" as \"age\" \
         from \"users\" u order by u.\"email\""
    );
}

#[tokio::test]
async fn exec_rejects_null_in_non_nullable_column() {
    let driver = MockDriver::new("app").respond(
        "from \"users\"",
        QueryOutput::with_rows(vec![vec![SqlValue::Null]]),
    );

    let err = query()
        .from(&users(), "u")
        .select(|s| vec![("email", s.field("u", "email").into())])
        .exec(&driver, &ExecOptions::default())
        .await
        .unwrap_err();

    match err {
        QueryError::Decode { label, expected, .. } => {
            assert_eq!(label, "email");
            assert_eq!(expected, "string");
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn exec_surfaces_driver_errors_with_the_sql() {
    let driver = MockDriver::new("app").fail_on("from \"users\"");

    let err = query()
        .from(&users(), "u")
        .select(|s| vec![("id", s.field("u", "id").into())])
        .exec(&driver, &ExecOptions::default())
        .await
        .unwrap_err();

    match err {
        QueryError::Statement { sql, .. } => {
            assert!(sql.contains("from \"users\" u"));
        }
        other => panic!("expected statement error, got {other:?}"),
    }
}

#[tokio::test]
async fn paging_renders_limit_and_offset() {
    let driver = MockDriver::new("app").respond("from \"users\"", QueryOutput::empty());

    query()
        .from(&users(), "u")
        .select(|s| vec![("id", s.field("u", "id").into())])
        .exec(
            &driver,
            &ExecOptions {
                page_size: Some(10),
                page_index: Some(2),
            },
        )
        .await
        .unwrap();

    assert!(driver.executed()[0].ends_with("limit 10 offset 20"));
}

#[tokio::test]
async fn boolean_projections_decode_booleans() {
    let driver = MockDriver::new("app").respond(
        "from \"users\"",
        QueryOutput::with_rows(vec![vec![SqlValue::Bool(true)]]),
    );

    let rows = query()
        .from(&users(), "u")
        .select(|s| vec![("adult", s.integer("u", "age").if_null(0).greater_than(17).into())])
        .exec(&driver, &ExecOptions::default())
        .await
        .unwrap();

    assert_eq!(rows[0].boolean("adult"), Some(true));
}
