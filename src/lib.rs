//! downpore
//!
//! A command-line client for the aria2 download daemon: adds torrents over
//! JSON-RPC, tracks them through magnet metadata resolution to completion,
//! and reports results as JSON. Also generates test torrents.

pub mod cli;
pub mod commands;
pub mod completion;
pub mod daemon;
pub mod error;
pub mod fixture;
pub mod torrent;

pub use error::{ClientError, Result};

pub use cli::{Action, CliArgs, Config, Report};
pub use commands::{execute, Command, Source};
pub use completion::{Clock, CompletionState, CompletionTracker, PollSettings, TokioClock};
pub use daemon::{Aria2Session, DaemonSession, DownloadRecord, Gid, SessionConfig, StatusSnapshot};
pub use torrent::{MagnetLink, Metainfo};
