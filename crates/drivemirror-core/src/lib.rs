//! drivemirror Core - Domain types, ports and configuration
//!
//! This crate contains the pieces shared by every other drivemirror crate:
//! - **Domain entities** - `MirrorNode`, `RemoteEntry`, `LocalEntry`, `RemoteId`
//! - **Port definitions** - the `RemoteStore` trait implemented by storage adapters
//! - **Transport handle** - a swappable shared holder for the active `RemoteStore`
//! - **Configuration** - YAML-backed settings with environment overrides
//!
//! # Architecture
//!
//! The domain module has no I/O. Ports define the trait interfaces that
//! adapter crates (`drivemirror-drive`) implement, and the reconciliation
//! engine (`drivemirror-sync`) consumes.

pub mod config;
pub mod domain;
pub mod ports;
