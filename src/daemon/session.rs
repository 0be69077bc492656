//! Daemon session
//!
//! `DaemonSession` is the seam between the command layer and a download
//! daemon. `Aria2Session` implements it over aria2's JSON-RPC interface.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::daemon::record::{DownloadRecord, METADATA_PREFIX};
use crate::daemon::rpc::RpcClient;
use crate::error::{ClientError, Result};
use crate::torrent::MagnetLink;

/// Identifier the daemon assigns to a registered download
pub type Gid = String;

/// How many waiting/stopped records to ask for per list call
const LIST_PAGE_SIZE: u64 = 1000;

/// Operations the client needs from a download daemon
#[async_trait]
pub trait DaemonSession: Send + Sync {
    /// Register a download from a validated magnet link
    async fn add_by_locator(&self, magnet: &MagnetLink) -> Result<Gid>;

    /// Register a download from a local `.torrent` file
    async fn add_by_file(&self, path: &Path) -> Result<Gid>;

    /// Every record the daemon currently knows about, in no particular order
    async fn list_all(&self) -> Result<Vec<DownloadRecord>>;

    /// One record, or `NotFound`
    async fn get_one(&self, gid: &str) -> Result<DownloadRecord>;

    /// Deregister a download, optionally deleting its files on this host
    async fn remove_one(&self, gid: &str, purge_files: bool) -> Result<Removal>;
}

/// Outcome of `DaemonSession::remove_one`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    /// False if the download was already gone
    pub removed: bool,
    /// At least one payload file was deleted locally
    pub deleted_files: bool,
}

/// Connection settings for an aria2 daemon
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// JSON-RPC endpoint, e.g. `http://127.0.0.1:6800/jsonrpc`
    pub endpoint: String,
    /// Value of the daemon's `--rpc-secret`
    pub secret: Option<String>,
    /// Target directory passed as the aria2 `dir` option
    pub download_dir: Option<String>,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

/// A live session with an aria2 daemon
pub struct Aria2Session {
    rpc: RpcClient,
    download_dir: Option<String>,
}

impl Aria2Session {
    /// Connect and confirm the daemon answers an authenticated call
    pub async fn connect(config: &SessionConfig) -> Result<Self> {
        info!("Connecting to aria2 at {}", config.endpoint);

        let rpc = RpcClient::new(config.endpoint.clone(), config.secret.clone(), config.request_timeout)?;

        match rpc.call::<Value>("aria2.getGlobalOption", vec![]).await {
            Ok(options) => {
                let default_dir = options.get("dir").and_then(|dir| dir.as_str()).unwrap_or("(unset)");
                debug!("aria2 default download dir: {}", default_dir);
            }
            Err(ClientError::Daemon { message, .. }) => {
                return Err(ClientError::connectivity_full(
                    "aria2 rejected the handshake",
                    config.endpoint.clone(),
                    message,
                ));
            }
            Err(e) => return Err(e),
        }

        info!("Connected to aria2");
        Ok(Self {
            rpc,
            download_dir: config.download_dir.clone(),
        })
    }

    fn add_options(&self) -> Value {
        match &self.download_dir {
            Some(dir) => json!({ "dir": dir }),
            None => json!({}),
        }
    }

    async fn list(&self, method: &str, params: Vec<Value>) -> Result<Vec<DownloadRecord>> {
        self.rpc.call(method, params).await
    }

    /// Take a record out of the daemon's queue and drop its result
    async fn deregister(&self, record: &DownloadRecord, force: bool) -> Result<()> {
        if record.status.is_queued() {
            let method = if force { "aria2.forceRemove" } else { "aria2.remove" };
            match self.rpc.call::<Value>(method, vec![json!(record.gid)]).await {
                Ok(_) => debug!("{} accepted for {}", method, record.gid),
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e.with_context(method)),
            }

            // Removal of an active download completes asynchronously
            if let Err(e) = self.rpc.call::<Value>("aria2.removeDownloadResult", vec![json!(record.gid)]).await {
                warn!("Could not clear result of {} yet: {}", record.gid, e);
            }
            return Ok(());
        }

        match self.rpc.call::<Value>("aria2.removeDownloadResult", vec![json!(record.gid)]).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.with_context("aria2.removeDownloadResult")),
        }
    }
}

#[async_trait]
impl DaemonSession for Aria2Session {
    async fn add_by_locator(&self, magnet: &MagnetLink) -> Result<Gid> {
        info!("Adding magnet link {}", magnet.info_hash_hex());
        let gid: Gid = self
            .rpc
            .call("aria2.addUri", vec![json!([magnet.as_str()]), self.add_options()])
            .await
            .map_err(|e| e.with_context("aria2.addUri"))?;
        info!("Registered magnet link as {}", gid);
        Ok(gid)
    }

    async fn add_by_file(&self, path: &Path) -> Result<Gid> {
        info!("Adding torrent file {}", path.display());
        let data = tokio::fs::read(path).await.map_err(|e| {
            ClientError::invalid_input_with_field(
                format!("Cannot read torrent file {}: {}", path.display(), e),
                "torrent-file",
            )
        })?;
        debug!("Torrent file size: {} bytes", data.len());

        let gid: Gid = self
            .rpc
            .call(
                "aria2.addTorrent",
                vec![json!(BASE64.encode(&data)), json!([]), self.add_options()],
            )
            .await
            .map_err(|e| e.with_context("aria2.addTorrent"))?;
        info!("Registered torrent file as {}", gid);
        Ok(gid)
    }

    async fn list_all(&self) -> Result<Vec<DownloadRecord>> {
        let mut records = self.list("aria2.tellActive", vec![]).await?;
        records.extend(self.list("aria2.tellWaiting", vec![json!(0), json!(LIST_PAGE_SIZE)]).await?);
        records.extend(self.list("aria2.tellStopped", vec![json!(0), json!(LIST_PAGE_SIZE)]).await?);
        debug!("Daemon reports {} downloads", records.len());
        Ok(records)
    }

    async fn get_one(&self, gid: &str) -> Result<DownloadRecord> {
        self.rpc.call("aria2.tellStatus", vec![json!(gid)]).await
    }

    async fn remove_one(&self, gid: &str, purge_files: bool) -> Result<Removal> {
        let record = match self.get_one(gid).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                info!("Download {} is already gone", gid);
                return Ok(Removal::default());
            }
            Err(e) => return Err(e),
        };

        let mut targets = vec![record];
        for child in targets[0].followed_by.clone() {
            match self.get_one(&child).await {
                Ok(r) => targets.push(r),
                Err(e) if e.is_not_found() => debug!("Follow-up download {} already gone", child),
                Err(e) => return Err(e),
            }
        }

        let mut deleted_files = false;
        for target in &targets {
            info!("Removing download {}", target.gid);
            self.deregister(target, purge_files).await?;
            if purge_files {
                deleted_files |= purge_local_files(target).await?;
            }
        }

        Ok(Removal {
            removed: true,
            deleted_files,
        })
    }
}

impl Drop for Aria2Session {
    fn drop(&mut self) {
        debug!("Closing aria2 session to {}", self.rpc.endpoint());
    }
}

/// Delete a record's files and aria2 control files if they exist locally.
/// Returns whether any payload file was deleted.
async fn purge_local_files(record: &DownloadRecord) -> Result<bool> {
    let mut deleted = false;
    for path in record.file_paths() {
        if path.starts_with(METADATA_PREFIX) {
            continue;
        }

        let path = PathBuf::from(path);
        let control = PathBuf::from(format!("{}.aria2", path.display()));

        for candidate in [&path, &control] {
            match tokio::fs::remove_file(candidate).await {
                Ok(()) => {
                    info!("Deleted {}", candidate.display());
                    deleted |= candidate == &path;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    if candidate == &path {
                        warn!("{} is not present on this host, nothing to delete", path.display());
                    }
                }
                Err(e) => {
                    return Err(ClientError::storage_error_full(
                        "Failed to delete downloaded file",
                        candidate.display().to_string(),
                        e.to_string(),
                    ));
                }
            }
        }
    }
    Ok(deleted)
}
