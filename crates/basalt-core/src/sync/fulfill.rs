//! Fulfillment: applying remediation actions.
//!
//! Issues run in the fixed kind order of
//! [`FULFILLMENT_ORDER`](super::issue::FULFILLMENT_ORDER) so required
//! objects exist before anything references them and drops precede
//! recreates. A failing statement is recorded on its issue and the
//! pass continues with the next issue.

use tracing::{debug, info, warn};

use crate::driver::Driver;

use super::issue::{SyncIssue, FULFILLMENT_ORDER};

/// Applies every issue's actions, recording per-issue success or the
/// first error.
pub(crate) async fn fulfill<D>(driver: &D, issues: &mut [SyncIssue])
where
    D: Driver + ?Sized,
{
    for kind in FULFILLMENT_ORDER {
        for issue in issues.iter_mut().filter(|i| i.issue_type == kind) {
            apply(driver, issue).await;
        }
    }
}

async fn apply<D>(driver: &D, issue: &mut SyncIssue)
where
    D: Driver + ?Sized,
{
    info!(
        issue = ?issue.issue_type,
        table = issue.table.as_deref().unwrap_or(""),
        field = issue.field.as_deref().unwrap_or(""),
        "applying issue"
    );

    for sql in &issue.actions {
        debug!(sql = %sql, "executing statement");
        if let Err(error) = driver.query(sql, &[]).await {
            warn!(sql = %sql, error = %error, "statement failed");
            issue.error = Some(error.to_string());
            issue.fulfilled = Some(false);
            return;
        }
    }
    issue.fulfilled = Some(true);
}
