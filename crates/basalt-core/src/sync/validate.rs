//! Pre-flight validation of the declared schema.
//!
//! Runs before any database I/O; every violation is fatal and aborts
//! the sync.

use std::collections::HashSet;

use crate::error::SchemaError;
use crate::schema::{FieldType, Table};
use crate::types::class_of;

/// Checks the declared tables against the schema-model invariants.
pub fn validate(tables: &[Table]) -> Result<(), SchemaError> {
    let mut seen_tables = HashSet::new();
    for table in tables {
        if !seen_tables.insert(table.name.as_str()) {
            return Err(SchemaError::DuplicateTable(table.name.clone()));
        }
    }

    for table in tables {
        let mut seen_fields = HashSet::new();
        let mut primary_keys = 0_usize;

        for field in &table.fields {
            if !seen_fields.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    table: table.name.clone(),
                    field: field.name.clone(),
                });
            }

            if field.is_primary_key() {
                primary_keys += 1;
                if primary_keys > 1 {
                    return Err(SchemaError::MultiplePrimaryKeys(table.name.clone()));
                }
                if field.is_nullable() {
                    return Err(SchemaError::NullablePrimaryKey {
                        table: table.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }

            if field.field_type == FieldType::Serial {
                if field.nullable.is_some() {
                    return Err(SchemaError::SerialModifier {
                        table: table.name.clone(),
                        field: field.name.clone(),
                        modifier: "nullable",
                    });
                }
                if field.unique.is_some() {
                    return Err(SchemaError::SerialModifier {
                        table: table.name.clone(),
                        field: field.name.clone(),
                        modifier: "unique",
                    });
                }
            }

            if let Some(reference) = &field.references {
                let target_table = tables.iter().find(|t| t.name == reference.table);
                let target_field =
                    target_table.and_then(|t| t.field_named(&reference.field));
                let Some(target_field) = target_field else {
                    return Err(SchemaError::UnknownReferenceTarget {
                        table: table.name.clone(),
                        field: field.name.clone(),
                        target_table: reference.table.clone(),
                        target_field: reference.field.clone(),
                    });
                };
                if !target_field.is_primary_key() {
                    return Err(SchemaError::ReferenceNotPrimaryKey {
                        table: table.name.clone(),
                        field: field.name.clone(),
                        target_table: reference.table.clone(),
                        target_field: reference.field.clone(),
                    });
                }
                if class_of(field.field_type) != class_of(target_field.field_type) {
                    return Err(SchemaError::ReferenceClassMismatch {
                        table: table.name.clone(),
                        field: field.name.clone(),
                        target_table: reference.table.clone(),
                        target_field: reference.field.clone(),
                    });
                }
            }

            if let Some(values) = &field.one_of {
                if values.is_empty() {
                    return Err(SchemaError::EmptyOneOf {
                        table: table.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }

            if field.index.is_some()
                && (field.field_type == FieldType::Serial
                    || field.references.is_some()
                    || field.is_unique()
                    || field.is_primary_key())
            {
                return Err(SchemaError::RedundantIndex {
                    table: table.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
    }

    Ok(())
}
