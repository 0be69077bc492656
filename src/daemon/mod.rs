//! Download daemon access
//!
//! The aria2 JSON-RPC transport, the session abstraction built on it, and the
//! projection of aria2 records onto status snapshots.

pub mod record;
pub mod rpc;
pub mod session;
pub mod status;

#[cfg(test)]
pub mod mock;

pub use record::{DownloadRecord, DownloadState};
pub use rpc::RpcClient;
pub use session::{Aria2Session, DaemonSession, Gid, Removal, SessionConfig};
pub use status::{project, StatusSnapshot};
