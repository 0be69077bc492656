//! JSON output envelopes
//!
//! Every action prints exactly one of these to stdout. Field names are part
//! of the tool's external contract; scripts key on them.

use serde::Serialize;

use crate::daemon::StatusSnapshot;
use crate::error::Result;

/// Status object embedded in `add`, `status` and `wait` output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub hash: String,
    pub name: String,
    pub size_bytes: u64,
    pub completed_bytes: u64,
    pub download_rate: u64,
    pub is_complete: bool,
    pub is_active: bool,
    pub error_message: Option<String>,
    pub progress_percent: f64,
}

impl From<&StatusSnapshot> for StatusReport {
    fn from(snapshot: &StatusSnapshot) -> Self {
        Self {
            hash: snapshot.gid.clone(),
            name: snapshot.name.clone(),
            size_bytes: snapshot.total_bytes,
            completed_bytes: snapshot.completed_bytes,
            download_rate: snapshot.rate_bytes_per_sec,
            is_complete: snapshot.is_complete,
            is_active: snapshot.is_active,
            error_message: snapshot.error.clone(),
            progress_percent: snapshot.progress_percent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddReport {
    pub success: bool,
    pub torrent_hash: String,
    pub status: StatusReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEnvelope {
    pub success: bool,
    pub status: StatusReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaitReport {
    pub success: bool,
    pub completed: bool,
    pub final_status: StatusReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilesReport {
    pub success: bool,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoveReport {
    pub success: bool,
    /// False when the identifier was already gone
    pub removed: bool,
    pub deleted_files: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadReport {
    pub success: bool,
    pub torrent_hash: String,
    pub torrent_name: String,
    pub files: Vec<String>,
    pub remote_file_path: Option<String>,
    pub download_size: u64,
    pub download_complete: bool,
}

impl DownloadReport {
    /// Build the `download` envelope from the requested identifier, the
    /// final snapshot of the content record and its files
    pub fn assemble(gid: &str, snapshot: &StatusSnapshot, files: Vec<String>) -> Self {
        Self {
            success: true,
            torrent_hash: gid.to_string(),
            torrent_name: snapshot.name.clone(),
            remote_file_path: files.first().cloned(),
            files,
            download_size: snapshot.total_bytes,
            download_complete: snapshot.is_complete,
        }
    }
}

/// Output of one CLI action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Add(AddReport),
    Status(StatusEnvelope),
    Wait(WaitReport),
    Files(FilesReport),
    Remove(RemoveReport),
    Download(DownloadReport),
}

impl Report {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            gid: "c000000000000001".to_string(),
            name: "test_file_40mb.bin".to_string(),
            total_bytes: 41_943_040,
            completed_bytes: 41_943_040,
            rate_bytes_per_sec: 0,
            is_complete: true,
            is_active: false,
            error: None,
        }
    }

    fn render(report: Report) -> Value {
        serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap()
    }

    #[test]
    fn test_status_object_keys() {
        let value = render(Report::Status(StatusEnvelope {
            success: true,
            status: StatusReport::from(&snapshot()),
        }));

        assert_eq!(
            value,
            json!({
                "success": true,
                "status": {
                    "hash": "c000000000000001",
                    "name": "test_file_40mb.bin",
                    "size_bytes": 41_943_040u64,
                    "completed_bytes": 41_943_040u64,
                    "download_rate": 0,
                    "is_complete": true,
                    "is_active": false,
                    "error_message": null,
                    "progress_percent": 100.0
                }
            })
        );
    }

    #[test]
    fn test_download_envelope_uses_first_file() {
        let files = vec!["/downloads/a.bin".to_string(), "/downloads/b.bin".to_string()];
        let value = render(Report::Download(DownloadReport::assemble("m000000000000001", &snapshot(), files)));

        assert_eq!(value["torrent_hash"], "m000000000000001");
        assert_eq!(value["torrent_name"], "test_file_40mb.bin");
        assert_eq!(value["remote_file_path"], "/downloads/a.bin");
        assert_eq!(value["download_size"], 41_943_040u64);
        assert_eq!(value["download_complete"], true);
        assert_eq!(value["files"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_download_envelope_without_files_has_null_path() {
        let value = render(Report::Download(DownloadReport::assemble("c1", &snapshot(), Vec::new())));
        assert_eq!(value["remote_file_path"], Value::Null);
        assert_eq!(value["files"], json!([]));
    }

    #[test]
    fn test_remove_and_files_envelopes() {
        let value = render(Report::Remove(RemoveReport {
            success: true,
            removed: false,
            deleted_files: true,
        }));
        assert_eq!(value, json!({"success": true, "removed": false, "deleted_files": true}));

        let value = render(Report::Files(FilesReport {
            success: true,
            files: vec!["/downloads/a.bin".to_string()],
        }));
        assert_eq!(value, json!({"success": true, "files": ["/downloads/a.bin"]}));
    }

    #[test]
    fn test_failed_snapshot_carries_error_message() {
        let failed = StatusSnapshot {
            is_complete: false,
            completed_bytes: 0,
            error: Some("No peers".to_string()),
            ..snapshot()
        };
        let report = StatusReport::from(&failed);
        assert_eq!(report.error_message.as_deref(), Some("No peers"));
        assert_eq!(report.progress_percent, 0.0);
    }
}
