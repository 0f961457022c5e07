//! Deletion sweeper
//!
//! The only place local deletions are detected. Lists every remote child of
//! a folder, across all pages, and deletes those without a local counterpart
//! of the same name and kind. A folder replaced locally by a file of the same
//! name (or the reverse) is therefore swept. Deleting a remote folder
//! removes its whole remote subtree.
//!
//! Remote children that share a name and kind are reported but left alone:
//! both match the local entry, and picking a survivor needs information the
//! mirror does not keep.

use std::collections::HashMap;

use drivemirror_core::domain::{EntryKind, MirrorNode, RemoteEntry};
use drivemirror_core::ports::ChildQuery;
use tracing::{debug, info, warn};

use crate::context::MirrorContext;
use crate::local::LocalListing;

/// Page size for full listings
pub const SWEEP_PAGE_SIZE: u32 = 1000;

/// What one sweep did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Remote children seen
    pub listed: usize,
    /// Remote children deleted
    pub deleted: usize,
    /// Deletions that failed
    pub failed: usize,
    /// Names present more than once with the same kind
    pub duplicates: usize,
    /// False if the listing was cut short by an error or shutdown
    pub complete: bool,
}

/// Deletes remote children of `node` with no counterpart in `local`
///
/// Nothing is deleted unless the remote listing was read to the end.
pub async fn sweep(ctx: &MirrorContext, node: &MirrorNode, local: &LocalListing) -> SweepSummary {
    let mut summary = SweepSummary::default();

    let Some(remote) = list_all(ctx, node).await else {
        return summary;
    };
    summary.listed = remote.len();
    summary.duplicates = report_duplicates(node, &remote);
    summary.complete = true;

    let store = ctx.store();
    for entry in remote
        .iter()
        .filter(|e| !local.has_counterpart(&e.name, e.kind))
    {
        match store.delete(&entry.id).await {
            Ok(()) => {
                info!(
                    path = %node.entry_path(&entry.name).display(),
                    id = %entry.id,
                    kind = ?entry.kind,
                    "Deleted remote entry with no local counterpart"
                );
                ctx.stats().record_entry_deleted();
                summary.deleted += 1;
            }
            Err(e) => {
                warn!(
                    path = %node.entry_path(&entry.name).display(),
                    id = %entry.id,
                    error = %format!("{e:#}"),
                    "Remote delete failed"
                );
                ctx.stats().record_error();
                summary.failed += 1;
            }
        }
    }

    debug!(
        path = %node.local_path().display(),
        listed = summary.listed,
        deleted = summary.deleted,
        "Sweep complete"
    );
    summary
}

/// Reads every page of `node`'s remote children
///
/// Returns `None` if a page fails or shutdown is requested between pages.
async fn list_all(ctx: &MirrorContext, node: &MirrorNode) -> Option<Vec<RemoteEntry>> {
    let query = ChildQuery::children_of(node.remote_folder_id().clone());
    let mut entries = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        if ctx.is_cancelled() {
            debug!(path = %node.local_path().display(), "Sweep interrupted by shutdown");
            return None;
        }

        let page = match ctx
            .store()
            .list(&query, SWEEP_PAGE_SIZE, page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    path = %node.local_path().display(),
                    error = %format!("{e:#}"),
                    "Remote listing failed, skipping sweep"
                );
                ctx.stats().record_error();
                return None;
            }
        };

        entries.extend(page.entries);
        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => return Some(entries),
        }
    }
}

fn report_duplicates(node: &MirrorNode, remote: &[RemoteEntry]) -> usize {
    let mut counts: HashMap<(&str, EntryKind), usize> = HashMap::new();
    for entry in remote {
        *counts.entry((entry.name.as_str(), entry.kind)).or_default() += 1;
    }

    let mut duplicates = 0;
    for ((name, kind), count) in counts.into_iter().filter(|(_, c)| *c > 1) {
        warn!(
            path = %node.entry_path(name).display(),
            ?kind,
            count,
            "Duplicate remote entries"
        );
        duplicates += 1;
    }
    duplicates
}
