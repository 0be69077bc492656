//! aria2 download records
//!
//! The shape returned by `aria2.tellStatus`, `aria2.tellActive`,
//! `aria2.tellWaiting` and `aria2.tellStopped`. aria2 encodes every number as
//! a decimal string; missing or unparseable numbers read as zero.

use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Prefix aria2 gives the placeholder file of a magnet metadata download
pub const METADATA_PREFIX: &str = "[METADATA]";

/// Download state as reported by aria2
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    Active,
    Waiting,
    Paused,
    Error,
    Complete,
    Removed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl DownloadState {
    /// Still registered in the active or waiting queue
    pub fn is_queued(self) -> bool {
        matches!(self, DownloadState::Active | DownloadState::Waiting | DownloadState::Paused)
    }
}

/// One file of a download
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFile {
    #[serde(default)]
    pub path: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub length: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub completed_length: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BittorrentInfo {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BittorrentMeta {
    #[serde(default)]
    pub info: Option<BittorrentInfo>,
}

/// A daemon-native download record
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub gid: String,
    #[serde(default)]
    pub status: DownloadState,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_length: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub completed_length: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub download_speed: u64,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub files: Vec<RecordFile>,
    #[serde(default)]
    pub bittorrent: Option<BittorrentMeta>,
    /// Downloads spawned by this one (magnet metadata → content)
    #[serde(default)]
    pub followed_by: Vec<String>,
    /// The download that spawned this one
    #[serde(default)]
    pub following: Option<String>,
}

impl DownloadRecord {
    /// Display name: torrent name, else the first file's name
    pub fn name(&self) -> String {
        if let Some(name) = self
            .bittorrent
            .as_ref()
            .and_then(|bt| bt.info.as_ref())
            .and_then(|info| info.name.clone())
        {
            return name;
        }

        let Some(first) = self.files.first() else {
            return String::new();
        };

        if first.path.starts_with(METADATA_PREFIX) {
            return first.path.clone();
        }

        Path::new(&first.path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Placeholder record that only resolves magnet metadata
    pub fn is_metadata(&self) -> bool {
        self.name().starts_with(METADATA_PREFIX)
    }

    pub fn is_complete(&self) -> bool {
        self.status == DownloadState::Complete
    }

    pub fn is_active(&self) -> bool {
        self.status == DownloadState::Active
    }

    pub fn has_failed(&self) -> bool {
        self.status == DownloadState::Error
    }

    /// Human-readable failure reason for an errored record
    pub fn error_text(&self) -> String {
        match (&self.error_message, &self.error_code) {
            (Some(msg), _) if !msg.is_empty() => msg.clone(),
            (_, Some(code)) => format!("aria2 error code {}", code),
            _ => "unknown error".to_string(),
        }
    }

    /// Paths of the files that belong to this download
    pub fn file_paths(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| !f.path.is_empty())
            .map(|f| f.path.clone())
            .collect()
    }
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    })
}
