//! Folder materializer
//!
//! Binds a local subdirectory to its remote twin, reusing an existing
//! remote folder of the same name or creating one.

use drivemirror_core::domain::{EntryKind, MirrorNode};
use drivemirror_core::ports::NewEntry;
use tracing::{debug, info, warn};

use crate::context::MirrorContext;
use crate::lookup;

/// Ensures a remote folder named `name` exists under `parent`
///
/// # Returns
/// The child node, or `None` if the folder could not be found or created.
/// `None` means "skip this subtree for this pass"; the failure has already
/// been logged and counted.
pub async fn ensure_child_folder(
    ctx: &MirrorContext,
    parent: &MirrorNode,
    name: &str,
) -> Option<MirrorNode> {
    let store = ctx.store();
    let parent_id = parent.remote_folder_id();

    let existing = match lookup::find(store.as_ref(), parent_id, name, EntryKind::Folder).await {
        Ok(found) => found,
        Err(e) => {
            warn!(
                path = %parent.entry_path(name).display(),
                error = %format!("{e:#}"),
                "Folder lookup failed, skipping subtree"
            );
            ctx.stats().record_error();
            return None;
        }
    };

    let folder = match existing {
        Some(folder) => {
            debug!(name, id = %folder.id, "Reusing remote folder");
            folder
        }
        None => match store
            .create(NewEntry::folder(name, parent_id.clone()), None)
            .await
        {
            Ok(created) => {
                info!(
                    path = %parent.entry_path(name).display(),
                    id = %created.id,
                    "Created remote folder"
                );
                ctx.stats().record_folder_created();
                created
            }
            Err(e) => {
                warn!(
                    path = %parent.entry_path(name).display(),
                    error = %format!("{e:#}"),
                    "Folder creation failed, skipping subtree"
                );
                ctx.stats().record_error();
                return None;
            }
        },
    };

    Some(parent.child(name, folder.id))
}
