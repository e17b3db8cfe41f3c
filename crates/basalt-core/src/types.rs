//! Bidirectional mapping between logical field types and physical
//! PostgreSQL types, with conversion compatibility.

use crate::schema::FieldType;

/// Coarse grouping of logical types used for reference-compatibility
/// checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// serial, integer.
    Integer,
    /// double.
    Double,
    /// string.
    Text,
}

struct TypeMapping {
    logical: FieldType,
    class: TypeClass,
    physical: &'static str,
    aliases: &'static [&'static str],
    converts_to: &'static [FieldType],
}

const TYPE_TABLE: [TypeMapping; 4] = [
    TypeMapping {
        logical: FieldType::Serial,
        class: TypeClass::Integer,
        physical: "bigserial",
        aliases: &["bigserial", "serial8"],
        converts_to: &[FieldType::Serial],
    },
    TypeMapping {
        logical: FieldType::Integer,
        class: TypeClass::Integer,
        physical: "bigint",
        aliases: &["bigint", "int8"],
        converts_to: &[FieldType::Integer, FieldType::Double, FieldType::String],
    },
    TypeMapping {
        logical: FieldType::Double,
        class: TypeClass::Double,
        physical: "float8",
        aliases: &["double precision", "float8"],
        converts_to: &[FieldType::Double, FieldType::String],
    },
    TypeMapping {
        logical: FieldType::String,
        class: TypeClass::Text,
        physical: "varchar",
        aliases: &["character varying", "varchar", "character", "char"],
        converts_to: &[FieldType::String],
    },
];

fn mapping(logical: FieldType) -> &'static TypeMapping {
    TYPE_TABLE
        .iter()
        .find(|m| m.logical == logical)
        .expect("every logical type is mapped")
}

/// Maps a physical type name to its logical type, matching aliases
/// case-insensitively.
#[must_use]
pub fn to_logical(physical: &str) -> Option<FieldType> {
    let lower = physical.trim().to_ascii_lowercase();
    TYPE_TABLE
        .iter()
        .find(|m| m.aliases.contains(&lower.as_str()))
        .map(|m| m.logical)
}

/// Maps a logical type to its canonical physical type name.
#[must_use]
pub fn to_physical(logical: FieldType) -> &'static str {
    mapping(logical).physical
}

/// Returns the type class of a logical type.
#[must_use]
pub fn class_of(logical: FieldType) -> TypeClass {
    mapping(logical).class
}

/// Whether an existing column of logical type `from` can be altered to
/// logical type `to` without losing information.
#[must_use]
pub fn can_convert(from: FieldType, to: FieldType) -> bool {
    mapping(from).converts_to.contains(&to)
}
