//! Domain entities
//!
//! This module contains the core domain types for drivemirror:
//! - Newtypes for validated remote identifiers
//! - Remote and local entry descriptors
//! - The mirror node, the unit of work of the reconciliation engine
//! - Domain-specific error types

pub mod entry;
pub mod errors;
pub mod newtypes;
pub mod node;

// Re-export commonly used types
pub use entry::{EntryKind, LocalEntry, RemoteEntry};
pub use errors::DomainError;
pub use newtypes::RemoteId;
pub use node::MirrorNode;
