//! Sync issues and results.

use serde::{Deserialize, Serialize};

/// One kind of divergence between the declared schema and the
/// database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncIssueType {
    /// The target schema does not exist.
    SchemaNotFound,
    /// A declared table has no columns in the database.
    TableNotFound,
    /// A declared field has no column.
    FieldNotFound,
    /// A column has a different physical type.
    FieldTypeMismatch,
    /// A column has different nullability.
    FieldNullableMismatch,
    /// A column has a different default.
    FieldDefaultValueMismatch,
    /// A declared primary key is missing.
    PrimaryKeyNotFound,
    /// A primary key exists but is not declared.
    PrimaryKeyDangling,
    /// A declared foreign key is missing.
    ForeignKeyNotFound,
    /// A foreign key exists but is not declared.
    ForeignKeyDangling,
    /// A foreign key exists with a different definition.
    ForeignKeyMismatch,
    /// A declared unique key is missing.
    UniqueKeyNotFound,
    /// A unique key exists but is not declared.
    UniqueKeyDangling,
    /// A declared check constraint is missing.
    CheckKeyNotFound,
    /// A check constraint exists but misses declared values.
    CheckKeyMismatch,
    /// A check constraint exists but is not declared.
    CheckKeyDangling,
    /// A declared b-tree index is missing.
    BtreeIndexNotFound,
    /// A b-tree index exists but is not declared.
    BtreeIndexDangling,
}

/// The order issues are applied in during fulfillment. Required
/// objects (schemas, tables, columns, primary keys) come before the
/// objects referencing them; drops come before recreates.
pub const FULFILLMENT_ORDER: [SyncIssueType; 18] = [
    SyncIssueType::SchemaNotFound,
    SyncIssueType::TableNotFound,
    SyncIssueType::FieldNotFound,
    SyncIssueType::FieldTypeMismatch,
    SyncIssueType::FieldNullableMismatch,
    SyncIssueType::FieldDefaultValueMismatch,
    SyncIssueType::PrimaryKeyNotFound,
    SyncIssueType::PrimaryKeyDangling,
    SyncIssueType::ForeignKeyNotFound,
    SyncIssueType::ForeignKeyDangling,
    SyncIssueType::ForeignKeyMismatch,
    SyncIssueType::UniqueKeyNotFound,
    SyncIssueType::UniqueKeyDangling,
    SyncIssueType::CheckKeyNotFound,
    SyncIssueType::CheckKeyMismatch,
    SyncIssueType::CheckKeyDangling,
    SyncIssueType::BtreeIndexNotFound,
    SyncIssueType::BtreeIndexDangling,
];

/// One divergence, with its remediation statements and resolvability
/// verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncIssue {
    /// The kind of divergence.
    pub issue_type: SyncIssueType,
    /// The schema being synchronized.
    pub schema: String,
    /// The table concerned, when applicable.
    pub table: Option<String>,
    /// The field concerned, when applicable.
    pub field: Option<String>,
    /// Whether the remediation is safe to apply automatically.
    pub resolvable: bool,
    /// Why the issue is not resolvable, when it is not.
    pub description: Option<String>,
    /// Set during fulfillment: whether all actions succeeded.
    pub fulfilled: Option<bool>,
    /// Remediation statements, applied in order.
    pub actions: Vec<String>,
    /// The first fulfillment error, when one occurred.
    pub error: Option<String>,
}

impl SyncIssue {
    pub(crate) fn new(issue_type: SyncIssueType, schema: &str) -> Self {
        Self {
            issue_type,
            schema: schema.to_string(),
            table: None,
            field: None,
            resolvable: true,
            description: None,
            fulfilled: None,
            actions: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub(crate) fn field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub(crate) fn actions(mut self, actions: Vec<String>) -> Self {
        self.actions = actions;
        self
    }

    pub(crate) fn unresolvable(mut self, description: &str) -> Self {
        self.resolvable = false;
        self.description = Some(description.to_string());
        self
    }
}

/// Options for a sync run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Apply the remediation actions when every issue is resolvable.
    pub fulfill: bool,
}

/// The outcome of a sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    /// Every divergence found, in discovery order.
    pub issues: Vec<SyncIssue>,
    /// All remediation statements, flattened in discovery order.
    pub actions: Vec<String>,
    /// Informational notes about undeclared database objects.
    pub warnings: Vec<String>,
    /// Whether every issue is individually resolvable.
    pub resolvable: bool,
    /// Whether the schemas match (no issues), or fulfillment fixed
    /// every issue.
    pub fulfilled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fulfillment_order_covers_every_kind_once() {
        for (i, kind) in FULFILLMENT_ORDER.iter().enumerate() {
            assert_eq!(
                FULFILLMENT_ORDER.iter().position(|k| k == kind),
                Some(i),
                "duplicate kind in fulfillment order"
            );
        }
        assert_eq!(FULFILLMENT_ORDER.len(), 18);
    }

    #[test]
    fn creations_precede_dependents() {
        let position = |k: SyncIssueType| {
            FULFILLMENT_ORDER.iter().position(|x| *x == k).unwrap()
        };
        assert!(position(SyncIssueType::SchemaNotFound) < position(SyncIssueType::TableNotFound));
        assert!(position(SyncIssueType::TableNotFound) < position(SyncIssueType::FieldNotFound));
        assert!(
            position(SyncIssueType::PrimaryKeyNotFound)
                < position(SyncIssueType::ForeignKeyNotFound)
        );
        assert!(
            position(SyncIssueType::FieldNotFound) < position(SyncIssueType::BtreeIndexNotFound)
        );
    }

    #[test]
    fn issue_serialization_uses_camel_case_kinds() {
        let issue = SyncIssue::new(SyncIssueType::FieldDefaultValueMismatch, "app")
            .table("users")
            .field("age");
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains("\"fieldDefaultValueMismatch\""));
    }
}
