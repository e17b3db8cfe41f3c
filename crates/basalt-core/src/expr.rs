//! The typed expression algebra.
//!
//! Every expression carries a SQL fragment and a type tag; the tag is
//! encoded as a distinct Rust type (`BoolExpr`, `IntExpr`, `DoubleExpr`,
//! `StringExpr`, `GenericExpr`) so that illegal operator combinations
//! do not compile. Expressions are immutable: combinators consume their
//! operands and return fresh values.
//!
//! Scope entries, whose tag is only known at runtime (it comes from a
//! declared [`Field`](crate::schema::Field)), are held as the tagged
//! union [`FieldExpr`] and narrowed with its accessor methods.

use crate::value::quote_literal;

/// Runtime type tag of an expression, used when decoding result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// No particular type (ordering terms, cast sources).
    Generic,
    /// Boolean.
    Boolean,
    /// Integer.
    Integer,
    /// Double.
    Double,
    /// String.
    String,
}

impl TypeTag {
    /// The lowercase tag name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::String => "string",
        }
    }
}

fn column_fragment(alias: &str, name: &str) -> String {
    format!("{alias}.\"{name}\"")
}

fn comparison(left: String, op: &str, right: String) -> BoolExpr {
    BoolExpr {
        sql: format!("({left} {op} {right})"),
        nullable: false,
    }
}

/// An operand that is acceptable wherever a numeric expression is:
/// either numeric expression type, or a numeric literal.
pub trait NumericOperand {
    /// The SQL fragment of the operand, lifting literals.
    fn into_fragment(self) -> String;
}

impl NumericOperand for i64 {
    fn into_fragment(self) -> String {
        format!("{self}")
    }
}

impl NumericOperand for i32 {
    fn into_fragment(self) -> String {
        format!("{self}")
    }
}

impl NumericOperand for f64 {
    fn into_fragment(self) -> String {
        format!("{self}")
    }
}

impl NumericOperand for IntExpr {
    fn into_fragment(self) -> String {
        self.sql
    }
}

impl NumericOperand for DoubleExpr {
    fn into_fragment(self) -> String {
        self.sql
    }
}

/// An operand acceptable wherever a string expression is: a string
/// expression or a string literal (quoted on lifting).
pub trait TextOperand {
    /// The SQL fragment of the operand, lifting literals.
    fn into_fragment(self) -> String;
}

impl TextOperand for &str {
    fn into_fragment(self) -> String {
        quote_literal(self)
    }
}

impl TextOperand for String {
    fn into_fragment(self) -> String {
        quote_literal(&self)
    }
}

impl TextOperand for StringExpr {
    fn into_fragment(self) -> String {
        self.sql
    }
}

macro_rules! impl_typed_common {
    ($ty:ident) => {
        impl $ty {
            /// The SQL fragment of the expression.
            #[must_use]
            pub fn sql(&self) -> &str {
                &self.sql
            }

            /// Whether the expression may evaluate to NULL.
            #[must_use]
            pub fn is_nullable(&self) -> bool {
                self.nullable
            }

            /// An ascending ordering term.
            #[must_use]
            pub fn asc(self) -> GenericExpr {
                GenericExpr {
                    sql: format!("{} asc", self.sql),
                }
            }

            /// A descending ordering term.
            #[must_use]
            pub fn desc(self) -> GenericExpr {
                GenericExpr {
                    sql: format!("{} desc", self.sql),
                }
            }

            /// Casts to integer: `cast(<frag> as bigint)`.
            #[must_use]
            pub fn cast_integer(self) -> IntExpr {
                IntExpr {
                    sql: format!("cast({} as bigint)", self.sql),
                    nullable: self.nullable,
                }
            }

            /// Casts to double: `cast(<frag> as double)`.
            #[must_use]
            pub fn cast_double(self) -> DoubleExpr {
                DoubleExpr {
                    sql: format!("cast({} as double)", self.sql),
                    nullable: self.nullable,
                }
            }

            /// Casts to string: `cast(<frag> as varchar)`.
            #[must_use]
            pub fn cast_string(self) -> StringExpr {
                StringExpr {
                    sql: format!("cast({} as varchar)", self.sql),
                    nullable: self.nullable,
                }
            }
        }
    };
}

macro_rules! impl_numeric_comparisons {
    ($ty:ident) => {
        impl $ty {
            /// `(<l> = <r>)`.
            #[must_use]
            pub fn equals(self, rhs: impl NumericOperand) -> BoolExpr {
                comparison(self.sql, "=", rhs.into_fragment())
            }

            /// `(<l> < <r>)`.
            #[must_use]
            pub fn less_than(self, rhs: impl NumericOperand) -> BoolExpr {
                comparison(self.sql, "<", rhs.into_fragment())
            }

            /// `(<l> > <r>)`.
            #[must_use]
            pub fn greater_than(self, rhs: impl NumericOperand) -> BoolExpr {
                comparison(self.sql, ">", rhs.into_fragment())
            }

            /// `(<l> <= <r>)`.
            #[must_use]
            pub fn less_than_or_equal(self, rhs: impl NumericOperand) -> BoolExpr {
                comparison(self.sql, "<=", rhs.into_fragment())
            }

            /// `(<l> >= <r>)`.
            #[must_use]
            pub fn greater_than_or_equal(self, rhs: impl NumericOperand) -> BoolExpr {
                comparison(self.sql, ">=", rhs.into_fragment())
            }

            /// Replaces NULL with a fallback: `coalesce(<frag>, <v>)`.
            ///
            /// The result is non-nullable.
            #[must_use]
            pub fn if_null(self, fallback: impl NumericOperand) -> Self {
                Self {
                    sql: format!("coalesce({}, {})", self.sql, fallback.into_fragment()),
                    nullable: false,
                }
            }
        }
    };
}

/// A boolean-tagged expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BoolExpr {
    sql: String,
    nullable: bool,
}

impl_typed_common!(BoolExpr);

impl BoolExpr {
    /// A boolean column reference.
    #[must_use]
    pub fn column(alias: &str, name: &str, nullable: bool) -> Self {
        Self {
            sql: column_fragment(alias, name),
            nullable,
        }
    }

    /// A boolean literal.
    #[must_use]
    pub fn literal(value: bool) -> Self {
        Self {
            sql: String::from(if value { "true" } else { "false" }),
            nullable: false,
        }
    }

    /// Logical negation: `(not <frag>)`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self {
            sql: format!("(not {})", self.sql),
            nullable: self.nullable,
        }
    }

    /// Replaces NULL with a fallback: `coalesce(<frag>, <v>)`.
    #[must_use]
    pub fn if_null(self, fallback: bool) -> Self {
        Self {
            sql: format!(
                "coalesce({}, {})",
                self.sql,
                if fallback { "true" } else { "false" }
            ),
            nullable: false,
        }
    }
}

/// An integer-tagged expression.
#[derive(Debug, Clone, PartialEq)]
pub struct IntExpr {
    sql: String,
    nullable: bool,
}

impl_typed_common!(IntExpr);
impl_numeric_comparisons!(IntExpr);

impl IntExpr {
    /// An integer column reference.
    #[must_use]
    pub fn column(alias: &str, name: &str, nullable: bool) -> Self {
        Self {
            sql: column_fragment(alias, name),
            nullable,
        }
    }

    /// An integer literal.
    #[must_use]
    pub fn literal(value: i64) -> Self {
        Self {
            sql: format!("{value}"),
            nullable: false,
        }
    }
}

/// A double-tagged expression.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleExpr {
    sql: String,
    nullable: bool,
}

impl_typed_common!(DoubleExpr);
impl_numeric_comparisons!(DoubleExpr);

impl DoubleExpr {
    /// A double column reference.
    #[must_use]
    pub fn column(alias: &str, name: &str, nullable: bool) -> Self {
        Self {
            sql: column_fragment(alias, name),
            nullable,
        }
    }

    /// A double literal.
    #[must_use]
    pub fn literal(value: f64) -> Self {
        Self {
            sql: format!("{value}"),
            nullable: false,
        }
    }
}

/// A string-tagged expression.
#[derive(Debug, Clone, PartialEq)]
pub struct StringExpr {
    sql: String,
    nullable: bool,
}

impl_typed_common!(StringExpr);

impl StringExpr {
    /// A string column reference.
    #[must_use]
    pub fn column(alias: &str, name: &str, nullable: bool) -> Self {
        Self {
            sql: column_fragment(alias, name),
            nullable,
        }
    }

    /// A string literal.
    #[must_use]
    pub fn literal(value: &str) -> Self {
        Self {
            sql: quote_literal(value),
            nullable: false,
        }
    }

    /// `(<l> = <r>)`.
    #[must_use]
    pub fn equals(self, rhs: impl TextOperand) -> BoolExpr {
        comparison(self.sql, "=", rhs.into_fragment())
    }

    /// Prefix match: `(<l> like (<x> || '%'))`.
    #[must_use]
    pub fn starts_with(self, prefix: impl TextOperand) -> BoolExpr {
        BoolExpr {
            sql: format!("({} like ({} || '%'))", self.sql, prefix.into_fragment()),
            nullable: false,
        }
    }

    /// Suffix match: `(<l> like ('%' || <x>))`.
    #[must_use]
    pub fn ends_with(self, suffix: impl TextOperand) -> BoolExpr {
        BoolExpr {
            sql: format!("({} like ('%' || {}))", self.sql, suffix.into_fragment()),
            nullable: false,
        }
    }

    /// `upper(<frag>)`.
    #[must_use]
    pub fn upper(self) -> Self {
        self.wrap("upper")
    }

    /// `lower(<frag>)`.
    #[must_use]
    pub fn lower(self) -> Self {
        self.wrap("lower")
    }

    /// `trim(<frag>)`.
    #[must_use]
    pub fn trim(self) -> Self {
        self.wrap("trim")
    }

    /// `ltrim(<frag>)`.
    #[must_use]
    pub fn trim_left(self) -> Self {
        self.wrap("ltrim")
    }

    /// `rtrim(<frag>)`.
    #[must_use]
    pub fn trim_right(self) -> Self {
        self.wrap("rtrim")
    }

    /// Replaces NULL with a fallback: `coalesce(<frag>, <v>)`.
    #[must_use]
    pub fn if_null(self, fallback: impl TextOperand) -> Self {
        Self {
            sql: format!("coalesce({}, {})", self.sql, fallback.into_fragment()),
            nullable: false,
        }
    }

    fn wrap(self, function: &str) -> Self {
        Self {
            sql: format!("{function}({})", self.sql),
            nullable: self.nullable,
        }
    }
}

/// An expression with no particular type: ordering terms and other
/// fragments that only ever reach the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericExpr {
    sql: String,
}

impl GenericExpr {
    /// The SQL fragment of the expression.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// An ascending ordering term.
    #[must_use]
    pub fn asc(self) -> Self {
        Self {
            sql: format!("{} asc", self.sql),
        }
    }

    /// A descending ordering term.
    #[must_use]
    pub fn desc(self) -> Self {
        Self {
            sql: format!("{} desc", self.sql),
        }
    }

    /// Casts to integer: `cast(<frag> as bigint)`.
    #[must_use]
    pub fn cast_integer(self) -> IntExpr {
        IntExpr {
            sql: format!("cast({} as bigint)", self.sql),
            nullable: false,
        }
    }

    /// Casts to double: `cast(<frag> as double)`.
    #[must_use]
    pub fn cast_double(self) -> DoubleExpr {
        DoubleExpr {
            sql: format!("cast({} as double)", self.sql),
            nullable: false,
        }
    }

    /// Casts to string: `cast(<frag> as varchar)`.
    #[must_use]
    pub fn cast_string(self) -> StringExpr {
        StringExpr {
            sql: format!("cast({} as varchar)", self.sql),
            nullable: false,
        }
    }
}

/// A scope entry: a column expression whose tag comes from the declared
/// field type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldExpr {
    /// An integer column (serial or integer fields).
    Integer(IntExpr),
    /// A double column.
    Double(DoubleExpr),
    /// A string column.
    String(StringExpr),
}

impl FieldExpr {
    /// The SQL fragment of the expression.
    #[must_use]
    pub fn sql(&self) -> &str {
        match self {
            Self::Integer(e) => e.sql(),
            Self::Double(e) => e.sql(),
            Self::String(e) => e.sql(),
        }
    }

    /// The type tag of the column.
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Integer(_) => TypeTag::Integer,
            Self::Double(_) => TypeTag::Double,
            Self::String(_) => TypeTag::String,
        }
    }

    /// Whether the column may be NULL.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Integer(e) => e.is_nullable(),
            Self::Double(e) => e.is_nullable(),
            Self::String(e) => e.is_nullable(),
        }
    }

    /// Narrows to an integer expression.
    ///
    /// # Panics
    ///
    /// Panics when the column is not integer-tagged; using a column at
    /// the wrong type is a construction-time failure.
    #[must_use]
    #[track_caller]
    pub fn integer(self) -> IntExpr {
        match self {
            Self::Integer(e) => e,
            other => panic!("column is {}, not integer", other.tag().as_str()),
        }
    }

    /// Narrows to a double expression.
    ///
    /// # Panics
    ///
    /// Panics when the column is not double-tagged.
    #[must_use]
    #[track_caller]
    pub fn double(self) -> DoubleExpr {
        match self {
            Self::Double(e) => e,
            other => panic!("column is {}, not double", other.tag().as_str()),
        }
    }

    /// Narrows to a string expression.
    ///
    /// # Panics
    ///
    /// Panics when the column is not string-tagged.
    #[must_use]
    #[track_caller]
    pub fn string(self) -> StringExpr {
        match self {
            Self::String(e) => e,
            other => panic!("column is {}, not string", other.tag().as_str()),
        }
    }

    /// An ascending ordering term.
    #[must_use]
    pub fn asc(self) -> GenericExpr {
        GenericExpr {
            sql: format!("{} asc", self.sql()),
        }
    }

    /// A descending ordering term.
    #[must_use]
    pub fn desc(self) -> GenericExpr {
        GenericExpr {
            sql: format!("{} desc", self.sql()),
        }
    }
}

/// One projected column: a fragment plus the decoded shape of the
/// result cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Selected {
    sql: String,
    tag: TypeTag,
    nullable: bool,
}

impl Selected {
    /// The SQL fragment of the projected expression.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The type tag driving row decoding.
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// Whether the decoded cell may be NULL.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

impl From<BoolExpr> for Selected {
    fn from(e: BoolExpr) -> Self {
        Self {
            nullable: e.nullable,
            sql: e.sql,
            tag: TypeTag::Boolean,
        }
    }
}

impl From<IntExpr> for Selected {
    fn from(e: IntExpr) -> Self {
        Self {
            nullable: e.nullable,
            sql: e.sql,
            tag: TypeTag::Integer,
        }
    }
}

impl From<DoubleExpr> for Selected {
    fn from(e: DoubleExpr) -> Self {
        Self {
            nullable: e.nullable,
            sql: e.sql,
            tag: TypeTag::Double,
        }
    }
}

impl From<StringExpr> for Selected {
    fn from(e: StringExpr) -> Self {
        Self {
            nullable: e.nullable,
            sql: e.sql,
            tag: TypeTag::String,
        }
    }
}

impl From<GenericExpr> for Selected {
    fn from(e: GenericExpr) -> Self {
        Self {
            sql: e.sql,
            tag: TypeTag::Generic,
            nullable: true,
        }
    }
}

impl From<FieldExpr> for Selected {
    fn from(e: FieldExpr) -> Self {
        match e {
            FieldExpr::Integer(e) => e.into(),
            FieldExpr::Double(e) => e.into(),
            FieldExpr::String(e) => e.into(),
        }
    }
}

/// One ordering term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    sql: String,
}

impl OrderTerm {
    /// The SQL fragment of the term.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl From<GenericExpr> for OrderTerm {
    fn from(e: GenericExpr) -> Self {
        Self { sql: e.sql }
    }
}

impl From<BoolExpr> for OrderTerm {
    fn from(e: BoolExpr) -> Self {
        Self { sql: e.sql }
    }
}

impl From<IntExpr> for OrderTerm {
    fn from(e: IntExpr) -> Self {
        Self { sql: e.sql }
    }
}

impl From<DoubleExpr> for OrderTerm {
    fn from(e: DoubleExpr) -> Self {
        Self { sql: e.sql }
    }
}

impl From<StringExpr> for OrderTerm {
    fn from(e: StringExpr) -> Self {
        Self { sql: e.sql }
    }
}

impl From<FieldExpr> for OrderTerm {
    fn from(e: FieldExpr) -> Self {
        Self {
            sql: e.sql().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_fragments_are_alias_qualified() {
        let e = IntExpr::column("t1", "field2", false);
        assert_eq!(e.sql(), "t1.\"field2\"");
    }

    #[test]
    fn rendering_is_pure() {
        let e = StringExpr::column("a", "name", true).if_null("x").upper();
        assert_eq!(e.sql(), e.clone().sql());
        assert_eq!(e.sql(), "upper(coalesce(a.\"name\", 'x'))");
    }

    #[test]
    fn numeric_comparisons() {
        assert_eq!(
            IntExpr::column("t", "a", false)
                .equals(IntExpr::column("u", "b", false))
                .sql(),
            "(t.\"a\" = u.\"b\")"
        );
        assert_eq!(
            IntExpr::column("t", "a", false).less_than(5_i64).sql(),
            "(t.\"a\" < 5)"
        );
        assert_eq!(
            DoubleExpr::column("t", "x", false)
                .greater_than_or_equal(0.5)
                .sql(),
            "(t.\"x\" >= 0.5)"
        );
        // Mixed numeric operands are allowed.
        assert_eq!(
            IntExpr::column("t", "a", false)
                .greater_than(DoubleExpr::column("t", "x", false))
                .sql(),
            "(t.\"a\" > t.\"x\")"
        );
    }

    #[test]
    fn string_operators() {
        let col = || StringExpr::column("t", "s", false);
        assert_eq!(col().equals("v").sql(), "(t.\"s\" = 'v')");
        assert_eq!(
            col().starts_with("ab").sql(),
            "(t.\"s\" like ('ab' || '%'))"
        );
        assert_eq!(col().ends_with("ab").sql(), "(t.\"s\" like ('%' || 'ab'))");
        assert_eq!(col().trim_left().sql(), "ltrim(t.\"s\")");
        assert_eq!(col().trim_right().sql(), "rtrim(t.\"s\")");
        assert_eq!(col().lower().sql(), "lower(t.\"s\")");
    }

    #[test]
    fn string_literals_are_escaped() {
        let e = StringExpr::column("t", "s", false).equals("it's");
        assert_eq!(e.sql(), "(t.\"s\" = 'it''s')");
    }

    #[test]
    fn boolean_not() {
        let e = IntExpr::column("t", "a", false).equals(1_i64).not();
        assert_eq!(e.sql(), "(not (t.\"a\" = 1))");
    }

    #[test]
    fn ordering_terms() {
        assert_eq!(
            StringExpr::column("t", "s", false).desc().sql(),
            "t.\"s\" desc"
        );
        assert_eq!(IntExpr::column("t", "a", false).asc().sql(), "t.\"a\" asc");
    }

    #[test]
    fn casts() {
        assert_eq!(
            StringExpr::column("t", "s", false).cast_integer().sql(),
            "cast(t.\"s\" as bigint)"
        );
        assert_eq!(
            IntExpr::column("t", "a", false).cast_string().sql(),
            "cast(t.\"a\" as varchar)"
        );
        assert_eq!(
            IntExpr::column("t", "a", false).cast_double().sql(),
            "cast(t.\"a\" as double)"
        );
    }

    #[test]
    fn if_null_clears_nullability() {
        let e = IntExpr::column("t", "a", true);
        assert!(e.is_nullable());
        let e = e.if_null(0_i64);
        assert!(!e.is_nullable());
        assert_eq!(e.sql(), "coalesce(t.\"a\", 0)");
    }

    #[test]
    fn operator_results_keep_their_tags() {
        // Operator closure: the result tag is fixed by the operator.
        let b: BoolExpr = IntExpr::column("t", "a", true).equals(2_i64);
        assert!(!b.is_nullable());
        let s: Selected = b.into();
        assert_eq!(s.tag(), TypeTag::Boolean);

        let s: Selected = StringExpr::column("t", "s", true).upper().into();
        assert_eq!(s.tag(), TypeTag::String);
        assert!(s.is_nullable());
    }

    #[test]
    #[should_panic(expected = "not integer")]
    fn narrowing_to_the_wrong_tag_panics() {
        let f = FieldExpr::String(StringExpr::column("t", "s", false));
        let _ = f.integer();
    }
}
