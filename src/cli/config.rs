//! CLI configuration module
//!
//! Validated settings derived from the command line.

use crate::cli::args::{Action, CliArgs};
use crate::completion::PollSettings;
use crate::daemon::SessionConfig;
use crate::error::{ClientError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Per-request HTTP timeout for RPC calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one client invocation
#[derive(Debug, Clone)]
pub struct Config {
    pub action: Action,
    /// Host including scheme, without port
    pub rpc_host: String,
    pub port: u16,
    /// None when the daemon runs without a secret
    pub rpc_secret: Option<String>,
    pub magnet_link: Option<String>,
    pub torrent_file: Option<PathBuf>,
    pub torrent_hash: Option<String>,
    pub download_dir: Option<String>,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub delete_files: bool,
}

impl Config {
    /// Create configuration from CLI arguments
    pub fn from_args(args: &CliArgs) -> Self {
        Self {
            action: args.action,
            rpc_host: args.rpc_host.trim_end_matches('/').to_string(),
            port: args.port,
            rpc_secret: Some(args.rpc_secret.clone()).filter(|s| !s.is_empty()),
            magnet_link: args.magnet_link.clone(),
            torrent_file: args.torrent_file.clone(),
            torrent_hash: args.torrent_hash.clone(),
            download_dir: args.download_dir.clone(),
            timeout: Duration::from_secs(args.timeout),
            poll_interval: Duration::from_secs(args.poll_interval),
            delete_files: args.delete_files,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ClientError::invalid_input_with_field("Port cannot be 0", "port"));
        }

        if self.timeout.is_zero() {
            return Err(ClientError::invalid_input_with_field("Timeout must be at least 1 second", "timeout"));
        }

        if self.poll_interval.is_zero() {
            return Err(ClientError::invalid_input_with_field(
                "Poll interval must be at least 1 second",
                "poll-interval",
            ));
        }

        let url = url::Url::parse(&self.rpc_host).map_err(|e| {
            ClientError::invalid_input_with_field(format!("Invalid RPC host: {}", e), "rpc-host")
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ClientError::invalid_input_with_field(
                "RPC host must be an http:// or https:// URL",
                "rpc-host",
            ));
        }

        if matches!(&self.download_dir, Some(dir) if dir.trim().is_empty()) {
            return Err(ClientError::invalid_input_with_field("Download directory cannot be empty", "download-dir"));
        }

        Ok(())
    }

    /// aria2 JSON-RPC endpoint URL
    pub fn endpoint(&self) -> String {
        format!("{}:{}/jsonrpc", self.rpc_host, self.port)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            endpoint: self.endpoint(),
            secret: self.rpc_secret.clone(),
            download_dir: self.download_dir.clone(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            timeout: self.timeout,
            interval: self.poll_interval,
        }
    }
}
