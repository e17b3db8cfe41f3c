//! The diff engine.
//!
//! Compares the declared tables against a catalog snapshot and
//! produces the ordered issue list. Two branches: when the schema does
//! not exist everything is a creation issue; when it exists, pass 1
//! walks column shapes and pass 2 walks keys and indexes. Data probes
//! (nullability tightening, uniqueness, check violations) go through
//! the driver and decide resolvability.

use tracing::debug;

use crate::driver::{Driver, QueryOutput};
use crate::error::SyncError;
use crate::schema::{FieldReference, FieldType, Table};
use crate::types::{can_convert, to_logical};
use crate::value::SqlValue;

use super::catalog::DbState;
use super::ddl;
use super::issue::{SyncIssue, SyncIssueType};

pub(crate) struct Differ<'a, D: Driver + ?Sized> {
    driver: &'a D,
    schema: &'a str,
    tables: &'a [Table],
    state: &'a DbState,
    issues: Vec<SyncIssue>,
    warnings: Vec<String>,
}

impl<'a, D: Driver + ?Sized> Differ<'a, D> {
    pub(crate) fn new(
        driver: &'a D,
        schema: &'a str,
        tables: &'a [Table],
        state: &'a DbState,
    ) -> Self {
        Self {
            driver,
            schema,
            tables,
            state,
            issues: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Runs the comparison and returns issues and warnings in
    /// discovery order.
    pub(crate) async fn run(mut self) -> Result<(Vec<SyncIssue>, Vec<String>), SyncError> {
        if self.state.schema_exists {
            self.diff_columns().await?;
            self.diff_keys().await?;
            self.collect_warnings();
        } else {
            self.schema_missing();
        }
        // Resolvability of a missing foreign key depends on issues
        // that may be discovered after it; re-evaluate once the list
        // is complete so table declaration order cannot change the
        // verdict.
        self.fixup_foreign_keys();
        Ok((self.issues, self.warnings))
    }

    fn issue(&self, issue_type: SyncIssueType) -> SyncIssue {
        SyncIssue::new(issue_type, self.schema)
    }

    async fn probe(&self, sql: &str) -> Result<QueryOutput, SyncError> {
        debug!(sql, "running data probe");
        self.driver
            .query(sql, &[])
            .await
            .map_err(|source| SyncError::statement(sql, source))
    }

    /// The whole-schema branch: everything becomes a creation issue.
    fn schema_missing(&mut self) {
        let schema = self.schema;
        self.issues.push(
            self.issue(SyncIssueType::SchemaNotFound)
                .actions(ddl::create_schema(schema)),
        );

        for table in self.tables {
            self.issues.push(
                self.issue(SyncIssueType::TableNotFound)
                    .table(&table.name)
                    .actions(ddl::create_table(schema, table)),
            );
            for field in &table.fields {
                if field.is_primary_key() {
                    self.issues.push(
                        self.issue(SyncIssueType::PrimaryKeyNotFound)
                            .table(&table.name)
                            .field(&field.name)
                            .actions(ddl::add_primary_key(schema, &table.name, &field.name)),
                    );
                }
                if let Some(reference) = &field.references {
                    self.issues.push(
                        self.issue(SyncIssueType::ForeignKeyNotFound)
                            .table(&table.name)
                            .field(&field.name)
                            .actions(ddl::add_foreign_key(
                                schema,
                                &table.name,
                                &field.name,
                                reference,
                            )),
                    );
                }
                if field.is_unique() {
                    self.issues.push(
                        self.issue(SyncIssueType::UniqueKeyNotFound)
                            .table(&table.name)
                            .field(&field.name)
                            .actions(ddl::add_unique(schema, &table.name, &field.name)),
                    );
                }
                if let Some(values) = &field.one_of {
                    self.issues.push(
                        self.issue(SyncIssueType::CheckKeyNotFound)
                            .table(&table.name)
                            .field(&field.name)
                            .actions(ddl::add_check(
                                schema,
                                &table.name,
                                &field.name,
                                field.field_type,
                                values,
                            )),
                    );
                }
                if field.index.is_some() {
                    self.issues.push(
                        self.issue(SyncIssueType::BtreeIndexNotFound)
                            .table(&table.name)
                            .field(&field.name)
                            .actions(ddl::create_index(schema, &table.name, &field.name)),
                    );
                }
            }
        }
    }

    /// Pass 1: table presence and column shapes.
    async fn diff_columns(&mut self) -> Result<(), SyncError> {
        let schema = self.schema;
        let state = self.state;

        for table in self.tables {
            if state.table_columns(&table.name).is_empty() {
                self.issues.push(
                    self.issue(SyncIssueType::TableNotFound)
                        .table(&table.name)
                        .actions(ddl::create_table(schema, table)),
                );
                continue;
            }

            for field in &table.fields {
                let Some(column) = state.column(&table.name, &field.name) else {
                    self.issues.push(
                        self.issue(SyncIssueType::FieldNotFound)
                            .table(&table.name)
                            .field(&field.name)
                            .actions(ddl::add_column(schema, &table.name, field)),
                    );
                    continue;
                };

                // Type.
                let observed = to_logical(&column.data_type);
                let type_matches = match (field.field_type, observed) {
                    (declared, Some(o)) if o == declared => true,
                    // An already-provisioned serial column reads back
                    // as a plain bigint.
                    (FieldType::Serial, Some(FieldType::Integer)) => true,
                    _ => false,
                };
                if !type_matches {
                    let convertible = observed
                        .map(|o| can_convert(o, field.field_type))
                        .unwrap_or(false);
                    let mut issue = self
                        .issue(SyncIssueType::FieldTypeMismatch)
                        .table(&table.name)
                        .field(&field.name)
                        .actions(ddl::alter_column_type(schema, &table.name, field));
                    if !convertible {
                        issue = issue.unresolvable(&format!(
                            "cannot convert {} to {}",
                            column.data_type, field.field_type
                        ));
                    }
                    self.issues.push(issue);
                }

                // Nullability; serial columns are implicitly not-null.
                if field.field_type != FieldType::Serial {
                    let declared_nullable = field.is_nullable();
                    let observed_nullable = !column.not_null;
                    if declared_nullable != observed_nullable {
                        let mut issue = self
                            .issue(SyncIssueType::FieldNullableMismatch)
                            .table(&table.name)
                            .field(&field.name)
                            .actions(ddl::alter_column_nullable(
                                schema,
                                &table.name,
                                &field.name,
                                declared_nullable,
                            ));
                        if !declared_nullable {
                            let sql = format!(
                                "select 1 from {} where {} is null limit 1",
                                ddl::qualified(schema, &table.name),
                                ddl::quote_ident(&field.name)
                            );
                            if self.probe(&sql).await?.row_count > 0 {
                                issue = issue.unresolvable("nulls found");
                            }
                        }
                        self.issues.push(issue);
                    }
                }

                // Default; serial defaults are sequence-driven and
                // never compared.
                if field.field_type != FieldType::Serial {
                    let declared = field.default_value.clone().unwrap_or_default();
                    let observed_default = match &column.default_expr {
                        Some(expr) if column.has_default => {
                            let sql = format!("select {expr} as value");
                            self.probe(&sql)
                                .await?
                                .rows
                                .first()
                                .and_then(|row| row.first())
                                .map(SqlValue::to_plain_text)
                                .unwrap_or_default()
                        }
                        _ => String::new(),
                    };
                    if declared != observed_default {
                        self.issues.push(
                            self.issue(SyncIssueType::FieldDefaultValueMismatch)
                                .table(&table.name)
                                .field(&field.name)
                                .actions(ddl::alter_column_default(schema, &table.name, field)),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Pass 2: keys and indexes.
    async fn diff_keys(&mut self) -> Result<(), SyncError> {
        let schema = self.schema;
        let state = self.state;

        for table in self.tables {
            for field in &table.fields {
                let column_exists = state.column(&table.name, &field.name).is_some();

                // Primary key.
                let existing_pk = state.constraint_on('p', &table.name, &field.name);
                match (field.is_primary_key(), existing_pk) {
                    (true, None) => {
                        self.issues.push(
                            self.issue(SyncIssueType::PrimaryKeyNotFound)
                                .table(&table.name)
                                .field(&field.name)
                                .actions(ddl::add_primary_key(schema, &table.name, &field.name)),
                        );
                    }
                    (false, Some(pk)) => {
                        let mut issue = self
                            .issue(SyncIssueType::PrimaryKeyDangling)
                            .table(&table.name)
                            .field(&field.name)
                            .actions(ddl::drop_constraint(schema, &table.name, &pk.name));
                        if !state
                            .foreign_keys_referencing(&table.name, &field.name)
                            .is_empty()
                        {
                            issue = issue.unresolvable("foreign keys reference this primary key");
                        }
                        self.issues.push(issue);
                    }
                    _ => {}
                }

                // Foreign key.
                let existing_fk = state.constraint_on('f', &table.name, &field.name);
                match (&field.references, existing_fk) {
                    (Some(reference), Some(fk)) => {
                        let declared_delete =
                            reference.on_delete.map_or('a', |a| a.code());
                        let declared_update =
                            reference.on_update.map_or('a', |a| a.code());
                        let target_matches = fk.ref_table.as_deref()
                            == Some(reference.table.as_str())
                            && fk.ref_columns.len() == 1
                            && fk.ref_columns[0] == reference.field;
                        if !target_matches
                            || fk.on_delete != declared_delete
                            || fk.on_update != declared_update
                        {
                            let mut actions =
                                ddl::drop_constraint(schema, &table.name, &fk.name);
                            actions.extend(ddl::add_foreign_key(
                                schema,
                                &table.name,
                                &field.name,
                                reference,
                            ));
                            self.issues.push(
                                self.issue(SyncIssueType::ForeignKeyMismatch)
                                    .table(&table.name)
                                    .field(&field.name)
                                    .actions(actions),
                            );
                        }
                    }
                    (Some(reference), None) => {
                        // Resolvability is settled by the fixup pass.
                        self.issues.push(
                            self.issue(SyncIssueType::ForeignKeyNotFound)
                                .table(&table.name)
                                .field(&field.name)
                                .actions(ddl::add_foreign_key(
                                    schema,
                                    &table.name,
                                    &field.name,
                                    reference,
                                )),
                        );
                    }
                    (None, Some(fk)) => {
                        self.issues.push(
                            self.issue(SyncIssueType::ForeignKeyDangling)
                                .table(&table.name)
                                .field(&field.name)
                                .actions(ddl::drop_constraint(schema, &table.name, &fk.name)),
                        );
                    }
                    (None, None) => {}
                }

                // Unique key.
                let existing_unique = state.constraint_on('u', &table.name, &field.name);
                match (field.is_unique(), existing_unique) {
                    (true, None) => {
                        let mut issue = self
                            .issue(SyncIssueType::UniqueKeyNotFound)
                            .table(&table.name)
                            .field(&field.name)
                            .actions(ddl::add_unique(schema, &table.name, &field.name));
                        if column_exists {
                            let quoted = ddl::quote_ident(&field.name);
                            let sql = format!(
                                "select (count(distinct {quoted}) = count({quoted})) as is_unique from {}",
                                ddl::qualified(schema, &table.name)
                            );
                            let unique = self
                                .probe(&sql)
                                .await?
                                .rows
                                .first()
                                .and_then(|row| row.first())
                                .and_then(SqlValue::as_bool)
                                .unwrap_or(true);
                            if !unique {
                                issue = issue.unresolvable("non-unique values found");
                            }
                        }
                        self.issues.push(issue);
                    }
                    (false, Some(unique)) => {
                        self.issues.push(
                            self.issue(SyncIssueType::UniqueKeyDangling)
                                .table(&table.name)
                                .field(&field.name)
                                .actions(ddl::drop_constraint(schema, &table.name, &unique.name)),
                        );
                    }
                    _ => {}
                }

                // Check constraint.
                let existing_check = state.constraint_on('c', &table.name, &field.name);
                match (&field.one_of, existing_check) {
                    (Some(values), Some(check)) => {
                        let all_present = values.iter().all(|v| {
                            check
                                .definition
                                .contains(&ddl::format_literal(field.field_type, v))
                        });
                        if !all_present {
                            let mut actions =
                                ddl::drop_constraint(schema, &table.name, &check.name);
                            actions.extend(ddl::add_check(
                                schema,
                                &table.name,
                                &field.name,
                                field.field_type,
                                values,
                            ));
                            let mut issue = self
                                .issue(SyncIssueType::CheckKeyMismatch)
                                .table(&table.name)
                                .field(&field.name)
                                .actions(actions);
                            if column_exists {
                                let literals: Vec<String> = values
                                    .iter()
                                    .map(|v| ddl::format_literal(field.field_type, v))
                                    .collect();
                                let sql = format!(
                                    "select 1 from {} where {} not in ({}) limit 1",
                                    ddl::qualified(schema, &table.name),
                                    ddl::quote_ident(&field.name),
                                    literals.join(", ")
                                );
                                if self.probe(&sql).await?.row_count > 0 {
                                    issue = issue
                                        .unresolvable("values outside the declared set found");
                                }
                            }
                            self.issues.push(issue);
                        }
                    }
                    (Some(values), None) => {
                        self.issues.push(
                            self.issue(SyncIssueType::CheckKeyNotFound)
                                .table(&table.name)
                                .field(&field.name)
                                .actions(ddl::add_check(
                                    schema,
                                    &table.name,
                                    &field.name,
                                    field.field_type,
                                    values,
                                )),
                        );
                    }
                    (None, Some(check)) => {
                        self.issues.push(
                            self.issue(SyncIssueType::CheckKeyDangling)
                                .table(&table.name)
                                .field(&field.name)
                                .actions(ddl::drop_constraint(schema, &table.name, &check.name)),
                        );
                    }
                    (None, None) => {}
                }

                // Secondary index. Primary, unique, referencing and
                // serial fields already get implicit indexes and are
                // skipped entirely.
                let index_relevant = !field.is_primary_key()
                    && !field.is_unique()
                    && field.references.is_none()
                    && field.field_type != FieldType::Serial;
                if index_relevant {
                    let existing_index = state.index_on(&table.name, &field.name);
                    match (field.index.is_some(), existing_index) {
                        (true, None) => {
                            self.issues.push(
                                self.issue(SyncIssueType::BtreeIndexNotFound)
                                    .table(&table.name)
                                    .field(&field.name)
                                    .actions(ddl::create_index(schema, &table.name, &field.name)),
                            );
                        }
                        (false, Some(index)) => {
                            self.issues.push(
                                self.issue(SyncIssueType::BtreeIndexDangling)
                                    .table(&table.name)
                                    .field(&field.name)
                                    .actions(ddl::drop_index(schema, &index.name)),
                            );
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    /// Re-evaluates every missing-foreign-key issue against the full
    /// issue list: the target primary key must exist in the database
    /// or be created by an already-queued resolvable issue.
    fn fixup_foreign_keys(&mut self) {
        let verdicts: Vec<(usize, bool)> = self
            .issues
            .iter()
            .enumerate()
            .filter(|(_, issue)| issue.issue_type == SyncIssueType::ForeignKeyNotFound)
            .map(|(position, issue)| {
                let reference = issue
                    .table
                    .as_deref()
                    .zip(issue.field.as_deref())
                    .and_then(|(table, field)| {
                        self.tables
                            .iter()
                            .find(|t| t.name == table)?
                            .field_named(field)?
                            .references
                            .as_ref()
                    });
                let ready = reference.is_some_and(|r| self.fk_target_ready(r));
                (position, ready)
            })
            .collect();

        for (position, ready) in verdicts {
            let issue = &mut self.issues[position];
            if ready {
                issue.resolvable = true;
                issue.description = None;
            } else {
                issue.resolvable = false;
                issue.description = Some(String::from("referenced primary key not found"));
            }
        }
    }

    fn fk_target_ready(&self, reference: &FieldReference) -> bool {
        if self.state.column(&reference.table, &reference.field).is_some()
            && self
                .state
                .constraint_on('p', &reference.table, &reference.field)
                .is_some()
        {
            return true;
        }

        self.issues.iter().any(|issue| {
            if !issue.resolvable || issue.table.as_deref() != Some(reference.table.as_str()) {
                return false;
            }
            match issue.issue_type {
                SyncIssueType::TableNotFound => {
                    self.declared_primary_key(&reference.table, &reference.field)
                }
                SyncIssueType::FieldNotFound | SyncIssueType::PrimaryKeyNotFound => {
                    issue.field.as_deref() == Some(reference.field.as_str())
                        && self.declared_primary_key(&reference.table, &reference.field)
                }
                _ => false,
            }
        })
    }

    fn declared_primary_key(&self, table: &str, field: &str) -> bool {
        self.tables
            .iter()
            .find(|t| t.name == table)
            .and_then(|t| t.field_named(field))
            .is_some_and(|f| f.is_primary_key())
    }

    /// Notes every database object that exists but is not declared.
    /// Informational only; warnings never become issues or actions.
    fn collect_warnings(&mut self) {
        let state = self.state;
        for db_table in state.table_names() {
            if !self.tables.iter().any(|t| t.name == db_table) {
                self.warnings.push(format!(
                    "table \"{}\".\"{db_table}\" exists in the database but is not declared",
                    self.schema
                ));
            }
        }
        for table in self.tables {
            for column in state.table_columns(&table.name) {
                if table.field_named(&column.column).is_none() {
                    self.warnings.push(format!(
                        "column \"{}\".\"{}\".\"{}\" exists in the database but is not declared",
                        self.schema, table.name, column.column
                    ));
                }
            }
        }
    }
}
