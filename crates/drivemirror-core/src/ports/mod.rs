//! Port definitions
//!
//! - [`RemoteStore`] - hierarchical remote storage (Google Drive, test doubles)
//! - [`TransportHandle`] / [`TransportSwap`] - shared, swappable holder for
//!   the active `RemoteStore`

pub mod remote_store;
pub mod transport;

pub use remote_store::{ChildQuery, FileContent, NewEntry, RemotePage, RemoteStore};
pub use transport::{transport, SharedStore, TransportHandle, TransportSwap};
