//! Mirror node
//!
//! A [`MirrorNode`] binds one local directory to one remote folder. It is
//! the unit of work pushed through the engine's queue and is never mutated
//! after construction.

use std::path::{Path, PathBuf};

use super::newtypes::RemoteId;

/// In-memory binding of a local directory to a remote folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorNode {
    local_path: PathBuf,
    remote_folder_id: RemoteId,
}

impl MirrorNode {
    /// Binds `local_path` to `remote_folder_id`
    pub fn new(local_path: impl Into<PathBuf>, remote_folder_id: RemoteId) -> Self {
        Self {
            local_path: local_path.into(),
            remote_folder_id,
        }
    }

    /// Builds the node for subdirectory `name` bound to `remote_folder_id`
    pub fn child(&self, name: &str, remote_folder_id: RemoteId) -> Self {
        Self {
            local_path: self.local_path.join(name),
            remote_folder_id,
        }
    }

    /// Local directory this node mirrors
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Remote folder receiving this directory's contents
    pub fn remote_folder_id(&self) -> &RemoteId {
        &self.remote_folder_id
    }

    /// Local path of a direct child entry
    pub fn entry_path(&self, name: &str) -> PathBuf {
        self.local_path.join(name)
    }
}
