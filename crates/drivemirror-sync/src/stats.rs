//! Cumulative mirror counters
//!
//! Counters are shared by every worker and never reset; the scheduler logs
//! a [`StatsSnapshot`] at the start of each pass.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by the engine
#[derive(Debug, Default)]
pub struct MirrorStats {
    folders_scanned: AtomicU64,
    folders_created: AtomicU64,
    files_uploaded: AtomicU64,
    files_replaced: AtomicU64,
    entries_deleted: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`MirrorStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub folders_scanned: u64,
    pub folders_created: u64,
    pub files_uploaded: u64,
    pub files_replaced: u64,
    pub entries_deleted: u64,
    pub errors: u64,
}

impl StatsSnapshot {
    /// Number of remote create/delete calls that succeeded
    ///
    /// A replacement counts twice (delete plus create).
    pub fn mutations(&self) -> u64 {
        self.folders_created + self.files_uploaded + 2 * self.files_replaced + self.entries_deleted
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned={} created={} uploaded={} replaced={} deleted={} errors={}",
            self.folders_scanned,
            self.folders_created,
            self.files_uploaded,
            self.files_replaced,
            self.entries_deleted,
            self.errors
        )
    }
}

impl MirrorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_folder_scanned(&self) {
        self.folders_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_folder_created(&self) {
        self.folders_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_uploaded(&self) {
        self.files_uploaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_replaced(&self) {
        self.files_replaced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_entry_deleted(&self) {
        self.entries_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            folders_scanned: self.folders_scanned.load(Ordering::Relaxed),
            folders_created: self.folders_created.load(Ordering::Relaxed),
            files_uploaded: self.files_uploaded.load(Ordering::Relaxed),
            files_replaced: self.files_replaced.load(Ordering::Relaxed),
            entries_deleted: self.entries_deleted.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
