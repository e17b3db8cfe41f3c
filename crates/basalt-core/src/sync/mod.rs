//! The schema synchronizer.
//!
//! [`sync`] validates the declared tables, reads the catalog state of
//! one named schema, diffs the two, and (when asked and safe) applies
//! the remediation actions in a fixed order.

pub mod catalog;
pub mod ddl;
mod diff;
mod fulfill;
pub mod issue;
pub mod validate;

use tracing::info;

use crate::driver::Driver;
use crate::error::SyncError;
use crate::schema::Table;

use diff::Differ;
use issue::{SyncOptions, SyncResult};

/// Synchronizes `schema` with the declared tables.
///
/// Declarative violations and introspection failures are fatal;
/// divergences are reported as issues on the returned result, never
/// as errors. With `options.fulfill` set and every issue resolvable,
/// the remediation actions are applied and their outcome recorded per
/// issue.
pub async fn sync<D>(
    driver: &D,
    schema: &str,
    tables: &[Table],
    options: &SyncOptions,
) -> Result<SyncResult, SyncError>
where
    D: Driver + ?Sized,
{
    validate::validate(tables)?;

    let state = catalog::read_state(driver, schema).await?;
    let (mut issues, warnings) = Differ::new(driver, schema, tables, &state).run().await?;

    let resolvable = issues.iter().all(|issue| issue.resolvable);
    let mut fulfilled = issues.is_empty();

    info!(
        schema,
        issues = issues.len(),
        warnings = warnings.len(),
        resolvable,
        "schema diff complete"
    );

    if options.fulfill && resolvable && !fulfilled {
        fulfill::fulfill(driver, &mut issues).await;
        fulfilled = issues.iter().all(|issue| issue.fulfilled == Some(true));
    }

    let actions = issues
        .iter()
        .flat_map(|issue| issue.actions.iter().cloned())
        .collect();

    Ok(SyncResult {
        issues,
        actions,
        warnings,
        resolvable,
        fulfilled,
    })
}
