//! Remote lookup
//!
//! Exact, case-sensitive name plus kind search among the direct children of
//! one remote folder. Only the first page is read: a folder holding more
//! than [`LOOKUP_PAGE_SIZE`] same-named entries of one kind is not a case
//! the mirror handles.

use anyhow::{Context, Result};
use drivemirror_core::domain::{EntryKind, RemoteEntry, RemoteId};
use drivemirror_core::ports::{ChildQuery, RemoteStore};

/// Page size for lookups
pub const LOOKUP_PAGE_SIZE: u32 = 1000;

/// Finds the child of `parent` named exactly `name` with the given kind
///
/// # Returns
/// The first match, or `None` when there is none. Remote failures are
/// returned, never reported as "not found".
pub async fn find(
    store: &dyn RemoteStore,
    parent: &RemoteId,
    name: &str,
    kind: EntryKind,
) -> Result<Option<RemoteEntry>> {
    let query = ChildQuery::named(parent.clone(), name, kind);
    let page = store
        .list(&query, LOOKUP_PAGE_SIZE, None)
        .await
        .with_context(|| format!("Lookup of '{name}' in {parent} failed"))?;

    Ok(page.entries.into_iter().find(|entry| query.matches(entry)))
}
