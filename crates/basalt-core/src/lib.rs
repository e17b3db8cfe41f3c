//! # basalt-core
//!
//! A typed SQL query builder and a PostgreSQL schema synchronizer,
//! sharing one declarative schema model.
//!
//! ## Declaring tables
//!
//! Tables are runtime values built with chainable constructors:
//!
//! ```rust
//! use basalt_core::{Field, FieldReference, ReferenceAction, Table};
//!
//! let users = Table::new("users")
//!     .field(Field::serial("id").primary_key())
//!     .field(Field::string("email").unique())
//!     .field(Field::string("status").one_of(["active", "blocked"]));
//!
//! let orders = Table::new("orders")
//!     .field(Field::serial("id").primary_key())
//!     .field(
//!         Field::integer("user_id").references(
//!             FieldReference::new("users", "id").on_delete(ReferenceAction::Cascade),
//!         ),
//!     );
//! ```
//!
//! ## Building queries
//!
//! A query grows through fixed stages; the scope passed to each
//! callback only contains the aliases bound so far, and every column
//! expression carries its declared type:
//!
//! ```rust
//! use basalt_core::{query, ExecOptions, Field, Table};
//!
//! let users = Table::new("users")
//!     .field(Field::serial("id").primary_key())
//!     .field(Field::string("email").unique())
//!     .field(Field::integer("age").nullable());
//!
//! let sql = query()
//!     .from(&users, "u")
//!     .select(|s| vec![("email", s.field("u", "email").into())])
//!     .where_clause(|s| s.integer("u", "age").if_null(0).greater_than_or_equal(18))
//!     .order_by(|s| s.string("u", "email").asc())
//!     .sql(&ExecOptions {
//!         page_size: Some(50),
//!         page_index: Some(0),
//!     });
//!
//! assert_eq!(
//!     sql,
//!     "select u.\"email\" as \"email\" from \"users\" u \
//!      where (coalesce(u.\"age\", 0) >= 18) \
//!      order by u.\"email\" asc limit 50 offset 0"
//! );
//! ```
//!
//! `exec` forwards the rendered SQL to a [`Driver`] and decodes rows
//! per the projection's type tags.
//!
//! ## Synchronizing schemas
//!
//! [`sync`] compares the declared tables against the live catalog of
//! one schema and reports every divergence as a
//! [`SyncIssue`](sync::issue::SyncIssue) with remediation SQL and a
//! resolvability verdict; with `fulfill` set, resolvable plans are
//! applied in dependency order. See the crate-level `sync` module.

pub mod driver;
pub mod error;
pub mod expr;
pub mod query;
pub mod schema;
pub mod sync;
pub mod types;
pub mod value;

pub use driver::{Driver, DriverError, QueryOutput, Row};
pub use error::{QueryError, SchemaError, SyncError};
pub use expr::{
    BoolExpr, DoubleExpr, FieldExpr, GenericExpr, IntExpr, OrderTerm, Selected, StringExpr,
    TypeTag,
};
pub use query::{query, ExecOptions, QueryRow, Scope};
pub use schema::{Field, FieldReference, FieldType, IndexKind, ReferenceAction, Table};
pub use sync::issue::{SyncIssue, SyncIssueType, SyncOptions, SyncResult};
pub use sync::sync;
pub use value::SqlValue;
