//! CLI arguments module
//!
//! Defines command-line argument parsing using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Operation to perform against the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Register a magnet link or torrent file
    Add,
    /// Report the status of a download
    Status,
    /// Block until a download completes
    Wait,
    /// List the files of a download
    Files,
    /// Deregister a download
    Remove,
    /// Add, wait, then report the files
    Download,
}

/// CLI arguments for the daemon client
#[derive(Debug, Clone, Parser)]
#[command(name = "downpore")]
#[command(about = "Drive an aria2 daemon over JSON-RPC to add, track and retrieve torrents", long_about = None)]
pub struct CliArgs {
    /// Action to perform
    #[arg(value_enum)]
    pub action: Action,

    /// aria2 RPC port
    #[arg(long, default_value_t = 6800)]
    pub port: u16,

    /// aria2 RPC host, including scheme
    #[arg(long, default_value = "http://127.0.0.1")]
    pub rpc_host: String,

    /// aria2 RPC secret (empty for none)
    #[arg(long, default_value = "changeme123")]
    pub rpc_secret: String,

    /// Magnet link for add/download
    #[arg(long, value_name = "URI")]
    pub magnet_link: Option<String>,

    /// Torrent file for add/download
    #[arg(long, value_name = "FILE")]
    pub torrent_file: Option<PathBuf>,

    /// Download identifier (GID) for status/wait/files/remove
    #[arg(long, value_name = "GID")]
    pub torrent_hash: Option<String>,

    /// Target directory on the daemon host
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<String>,

    /// Seconds to wait for completion
    #[arg(long, default_value_t = 3600)]
    pub timeout: u64,

    /// Seconds between status polls
    #[arg(long, default_value_t = 5)]
    pub poll_interval: u64,

    /// Delete downloaded files when removing
    #[arg(long)]
    pub delete_files: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (errors only on stderr)
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the log level based on verbosity settings
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::ERROR
        } else {
            tracing::Level::INFO
        }
    }
}
