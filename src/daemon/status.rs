//! Status projection
//!
//! Turns a daemon record into an implementation-independent snapshot.

use crate::daemon::record::DownloadRecord;

/// Immutable status of one download at the moment it was polled
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub gid: String,
    pub name: String,
    pub total_bytes: u64,
    pub completed_bytes: u64,
    pub rate_bytes_per_sec: u64,
    pub is_complete: bool,
    pub is_active: bool,
    /// Set only when the daemon reports a hard failure
    pub error: Option<String>,
}

impl StatusSnapshot {
    /// Download progress as a percentage, 0 when the size is unknown
    pub fn progress_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.completed_bytes as f64 / self.total_bytes as f64) * 100.0
    }
}

/// Project a daemon record onto a status snapshot
pub fn project(record: &DownloadRecord) -> StatusSnapshot {
    let completed_bytes = if record.total_length > 0 {
        record.completed_length.min(record.total_length)
    } else {
        record.completed_length
    };

    StatusSnapshot {
        gid: record.gid.clone(),
        name: record.name(),
        total_bytes: record.total_length,
        completed_bytes,
        rate_bytes_per_sec: record.download_speed,
        is_complete: record.is_complete(),
        is_active: record.is_active(),
        error: record.has_failed().then(|| record.error_text()),
    }
}
