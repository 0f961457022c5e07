//! drivemirror Sync - one-way mirror reconciliation engine
//!
//! Walks a local directory tree and brings a remote folder hierarchy into
//! agreement with it using only names and file sizes. Every pass is a full
//! re-scan; nothing is persisted between passes.
//!
//! ## Modules
//!
//! - [`lookup`] - exact name + kind search among a remote folder's children
//! - [`materializer`] - find-or-create the remote twin of a local subfolder
//! - [`reconciler`] - create, keep or replace one remote file
//! - [`sweeper`] - delete remote children with no local counterpart
//! - [`processor`] - per-folder scan, dispatch and sweep
//! - [`pool`] - shared work queue and the worker tasks draining it
//! - [`scheduler`] - periodic seeding of the queue with the root node
//! - [`bootstrap`] - fatal startup checks and destination resolution
//! - [`local`] - local directory listing and the reserved-name denylist
//! - [`stats`] - cumulative counters reported per pass

pub mod bootstrap;
pub mod context;
pub mod local;
pub mod lookup;
pub mod materializer;
pub mod pool;
pub mod processor;
pub mod reconciler;
pub mod scheduler;
pub mod stats;
pub mod sweeper;

use std::path::PathBuf;

use thiserror::Error;

pub use context::MirrorContext;

/// Errors that prevent the mirror from starting
///
/// Everything that can go wrong once passes are running is logged and
/// skipped instead of being returned.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The source root cannot be read
    #[error("Source folder {path} is not accessible: {source}")]
    SourceUnavailable {
        /// Configured source root
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The source root exists but is not a directory
    #[error("Source {0} is not a directory")]
    SourceNotDirectory(PathBuf),

    /// The destination folder could not be found or created on the remote
    #[error("Destination folder '{name}' is unavailable: {reason}")]
    DestinationUnavailable {
        /// Destination folder name under the remote root
        name: String,
        /// Rendered error chain from the remote store
        reason: String,
    },
}
