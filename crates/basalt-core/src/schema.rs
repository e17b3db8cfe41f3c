//! The declarative schema model.
//!
//! Tables and fields are plain values built once through chainable
//! constructors and never mutated afterwards. Both the query builder
//! and the synchronizer consume this model.

use serde::{Deserialize, Serialize};

/// The logical type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Auto-incrementing integer; implicitly not-null and unique.
    Serial,
    /// 64-bit integer.
    Integer,
    /// Double-precision float.
    Double,
    /// Variable-length text.
    String,
}

impl FieldType {
    /// The lowercase name of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::String => "string",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Referential action on delete/update of the referenced row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceAction {
    /// `no action` (the default).
    NoAction,
    /// `restrict`.
    Restrict,
    /// `cascade`.
    Cascade,
    /// `set default`.
    SetDefault,
}

impl ReferenceAction {
    /// The SQL rendering of the action.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "no action",
            Self::Restrict => "restrict",
            Self::Cascade => "cascade",
            Self::SetDefault => "set default",
        }
    }

    /// The single-character code pg_constraint uses for the action.
    #[must_use]
    pub fn code(self) -> char {
        match self {
            Self::NoAction => 'a',
            Self::Restrict => 'r',
            Self::Cascade => 'c',
            Self::SetDefault => 'd',
        }
    }
}

/// The kind of secondary index a field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// A b-tree index.
    Btree,
}

impl IndexKind {
    /// The access-method name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Btree => "btree",
        }
    }
}

/// A foreign-key declaration on a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldReference {
    /// Referenced table.
    pub table: String,
    /// Referenced field (must be that table's primary key).
    pub field: String,
    /// Action on delete of the referenced row.
    pub on_delete: Option<ReferenceAction>,
    /// Action on update of the referenced key.
    pub on_update: Option<ReferenceAction>,
}

impl FieldReference {
    /// A reference to `table.field` with default actions.
    pub fn new(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            on_delete: None,
            on_update: None,
        }
    }

    /// Sets the on-delete action.
    #[must_use]
    pub fn on_delete(mut self, action: ReferenceAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets the on-update action.
    #[must_use]
    pub fn on_update(mut self, action: ReferenceAction) -> Self {
        self.on_update = Some(action);
        self
    }
}

/// One declared column.
///
/// `nullable` and `unique` are `Option<bool>` because *absence* is
/// meaningful: serial fields must not declare them at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Logical type.
    pub field_type: FieldType,
    /// Whether NULL is allowed (absent means not-null).
    pub nullable: Option<bool>,
    /// Whether a unique key is declared.
    pub unique: Option<bool>,
    /// Textual default literal, interpreted per `field_type`.
    pub default_value: Option<String>,
    /// Whether this field is the table's primary key.
    pub primary_key: Option<bool>,
    /// Foreign-key declaration.
    pub references: Option<FieldReference>,
    /// Allowed literal values, enforced with a check constraint.
    pub one_of: Option<Vec<String>>,
    /// Secondary index declaration.
    pub index: Option<IndexKind>,
}

impl Field {
    fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: None,
            unique: None,
            default_value: None,
            primary_key: None,
            references: None,
            one_of: None,
            index: None,
        }
    }

    /// A serial field.
    pub fn serial(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Serial)
    }

    /// An integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    /// A double field.
    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Double)
    }

    /// A string field.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Allows NULL.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    /// Declares a unique key.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = Some(true);
        self
    }

    /// Marks the field as the table's primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = Some(true);
        self
    }

    /// Sets the default literal.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Declares a foreign key.
    #[must_use]
    pub fn references(mut self, reference: FieldReference) -> Self {
        self.references = Some(reference);
        self
    }

    /// Restricts the field to a set of literal values.
    #[must_use]
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Declares a b-tree index.
    #[must_use]
    pub fn index(mut self) -> Self {
        self.index = Some(IndexKind::Btree);
        self
    }

    /// Whether NULL is allowed (absent declarations mean not-null).
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(false)
    }

    /// Whether a unique key is declared.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique.unwrap_or(false)
    }

    /// Whether the field is the table's primary key.
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.primary_key.unwrap_or(false)
    }
}

/// A declared table: a name and its ordered fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Fields, in declaration order.
    pub fields: Vec<Field>,
}

impl Table {
    /// An empty table declaration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the primary-key field, if one is declared.
    #[must_use]
    pub fn primary_key_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_primary_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain() {
        let t = Table::new("users")
            .field(Field::serial("id").primary_key())
            .field(Field::string("email").unique())
            .field(
                Field::integer("org_id")
                    .references(FieldReference::new("orgs", "id").on_delete(ReferenceAction::Cascade)),
            );

        assert_eq!(t.fields.len(), 3);
        assert_eq!(t.primary_key_field().unwrap().name, "id");
        assert!(t.field_named("email").unwrap().is_unique());
        let r = t.field_named("org_id").unwrap().references.as_ref().unwrap();
        assert_eq!(r.on_delete, Some(ReferenceAction::Cascade));
        assert_eq!(r.on_update, None);
    }

    #[test]
    fn absent_modifiers_default_to_false() {
        let f = Field::string("note");
        assert!(!f.is_nullable());
        assert!(!f.is_unique());
        assert!(!f.is_primary_key());
    }

    #[test]
    fn reference_action_codes() {
        assert_eq!(ReferenceAction::NoAction.code(), 'a');
        assert_eq!(ReferenceAction::Restrict.code(), 'r');
        assert_eq!(ReferenceAction::Cascade.code(), 'c');
        assert_eq!(ReferenceAction::SetDefault.code(), 'd');
    }
}
