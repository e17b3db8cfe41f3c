//! SQL values crossing the driver boundary.
//!
//! [`SqlValue`] is the common currency between the query layer and a
//! [`Driver`](crate::driver::Driver): bound parameters, decoded result
//! cells, and inlined literals all use it.

use serde::{Deserialize, Serialize};

/// A SQL value.
///
/// Covers the four base types of the data model plus NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Double-precision value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl SqlValue {
    /// Renders the value as an inline SQL literal.
    ///
    /// Text is single-quoted with embedded quotes doubled; booleans
    /// render as `true`/`false`.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("null"),
            Self::Bool(b) => String::from(if *b { "true" } else { "false" }),
            Self::Int(n) => format!("{n}"),
            Self::Float(f) => format!("{f}"),
            Self::Text(s) => quote_literal(s),
        }
    }

    /// Renders the value as plain text, without quoting.
    ///
    /// NULL renders as the empty string. Used when comparing an
    /// evaluated column default against a declared textual default.
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => String::from(if *b { "true" } else { "false" }),
            Self::Int(n) => format!("{n}"),
            Self::Float(f) => format!("{f}"),
            Self::Text(s) => s.clone(),
        }
    }

    /// Returns the contained text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the contained boolean, if this is a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Single-quotes a string literal, doubling embedded quotes.
#[must_use]
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Trait for types that can be converted to a [`SqlValue`].
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_rendering() {
        assert_eq!(SqlValue::Null.to_sql_inline(), "null");
        assert_eq!(SqlValue::Bool(true).to_sql_inline(), "true");
        assert_eq!(SqlValue::Int(-3).to_sql_inline(), "-3");
        assert_eq!(SqlValue::Float(0.5).to_sql_inline(), "0.5");
        assert_eq!(
            SqlValue::Text(String::from("hello")).to_sql_inline(),
            "'hello'"
        );
    }

    #[test]
    fn inline_text_escaping() {
        assert_eq!(
            SqlValue::Text(String::from("O'Brien")).to_sql_inline(),
            "'O''Brien'"
        );
    }

    #[test]
    fn plain_text() {
        assert_eq!(SqlValue::Null.to_plain_text(), "");
        assert_eq!(SqlValue::Int(42).to_plain_text(), "42");
        assert_eq!(SqlValue::Text(String::from("a")).to_plain_text(), "a");
    }

    #[test]
    fn conversions() {
        assert_eq!(true.to_sql_value(), SqlValue::Bool(true));
        assert_eq!(7_i64.to_sql_value(), SqlValue::Int(7));
        assert_eq!("x".to_sql_value(), SqlValue::Text(String::from("x")));
        assert_eq!(None::<i64>.to_sql_value(), SqlValue::Null);
    }
}
