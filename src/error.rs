//! Error types for the daemon client
//!
//! Every failure the client can report is one of these kinds. Each kind maps
//! to its own process exit code so callers scripting the CLI can tell a bad
//! argument from an unreachable daemon or a failed transfer.

use std::fmt;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, ClientError>;

/// Error type for daemon client operations
#[derive(Debug, Clone)]
pub enum ClientError {
    /// Malformed user input (bad magnet link, missing option, unreadable file)
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    /// The daemon could not be reached or rejected the handshake
    Connectivity {
        message: String,
        address: Option<String>,
        source: Option<String>,
    },

    /// The daemon rejected an operation
    Daemon {
        message: String,
        code: Option<i64>,
    },

    /// The identifier is unknown to the daemon
    NotFound {
        gid: String,
    },

    /// A tracked record reported a hard failure while waiting
    DownloadFailed {
        gid: String,
        message: String,
    },

    /// The deadline elapsed while still waiting
    Timeout {
        gid: String,
        timeout_secs: u64,
    },

    /// Local file I/O errors
    Storage {
        message: String,
        path: Option<String>,
        source: Option<String>,
    },
}

impl ClientError {
    /// Create a new InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ClientError::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new InvalidInput error naming the offending option
    pub fn invalid_input_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        ClientError::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new Connectivity error
    pub fn connectivity(message: impl Into<String>) -> Self {
        ClientError::Connectivity {
            message: message.into(),
            address: None,
            source: None,
        }
    }

    /// Create a new Connectivity error with address and source
    pub fn connectivity_full(message: impl Into<String>, address: impl Into<String>, source: impl Into<String>) -> Self {
        ClientError::Connectivity {
            message: message.into(),
            address: Some(address.into()),
            source: Some(source.into()),
        }
    }

    /// Create a new Daemon error
    pub fn daemon(message: impl Into<String>) -> Self {
        ClientError::Daemon {
            message: message.into(),
            code: None,
        }
    }

    /// Create a new Daemon error carrying the JSON-RPC error code
    pub fn daemon_with_code(message: impl Into<String>, code: i64) -> Self {
        ClientError::Daemon {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Create a new NotFound error
    pub fn not_found(gid: impl Into<String>) -> Self {
        ClientError::NotFound { gid: gid.into() }
    }

    /// Create a new DownloadFailed error
    pub fn download_failed(gid: impl Into<String>, message: impl Into<String>) -> Self {
        ClientError::DownloadFailed {
            gid: gid.into(),
            message: message.into(),
        }
    }

    /// Create a new Timeout error
    pub fn timeout(gid: impl Into<String>, timeout_secs: u64) -> Self {
        ClientError::Timeout {
            gid: gid.into(),
            timeout_secs,
        }
    }

    /// Create a new Storage error
    pub fn storage_error(message: impl Into<String>) -> Self {
        ClientError::Storage {
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a new Storage error with path and source
    pub fn storage_error_full(message: impl Into<String>, path: impl Into<String>, source: impl Into<String>) -> Self {
        ClientError::Storage {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source.into()),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match &mut self {
            ClientError::Connectivity { source, .. } | ClientError::Storage { source, .. } => {
                *source = Some(source.as_ref().map_or_else(|| ctx.clone(), |s| format!("{}: {}", s, ctx)));
            }
            ClientError::Daemon { message, .. } => {
                *message = format!("{}: {}", ctx, message);
            }
            _ => {}
        }
        self
    }

    /// Process exit code reported for this kind of error
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::Storage { .. } => 1,
            ClientError::InvalidInput { .. } => 2,
            ClientError::Connectivity { .. } => 3,
            ClientError::Daemon { .. } => 4,
            ClientError::NotFound { .. } => 5,
            ClientError::DownloadFailed { .. } => 6,
            ClientError::Timeout { .. } => 7,
        }
    }

    /// True when the daemon signalled that an identifier does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::InvalidInput { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "{} (option: --{})", message, field_val)
                } else {
                    write!(f, "{}", message)
                }
            }
            ClientError::Connectivity { message, address, source } => {
                match (address, source) {
                    (Some(a), Some(s)) => write!(f, "Connection error: {} (address: {}, source: {})", message, a, s),
                    (Some(a), None) => write!(f, "Connection error: {} (address: {})", message, a),
                    (None, Some(s)) => write!(f, "Connection error: {} (source: {})", message, s),
                    (None, None) => write!(f, "Connection error: {}", message),
                }
            }
            ClientError::Daemon { message, code } => {
                if let Some(c) = code {
                    write!(f, "Daemon error: {} (code: {})", message, c)
                } else {
                    write!(f, "Daemon error: {}", message)
                }
            }
            ClientError::NotFound { gid } => {
                write!(f, "Torrent with GID {} not found", gid)
            }
            ClientError::DownloadFailed { gid, message } => {
                write!(f, "Download failed: {} (gid: {})", message, gid)
            }
            ClientError::Timeout { gid, timeout_secs } => {
                write!(f, "Torrent {} not completed within {} seconds", gid, timeout_secs)
            }
            ClientError::Storage { message, path, source } => {
                match (path, source) {
                    (Some(p), Some(s)) => write!(f, "Storage error: {} (path: {}, source: {})", message, p, s),
                    (Some(p), None) => write!(f, "Storage error: {} (path: {})", message, p),
                    (None, Some(s)) => write!(f, "Storage error: {} (source: {})", message, s),
                    (None, None) => write!(f, "Storage error: {}", message),
                }
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::storage_error_full(err.to_string(), "unknown".to_string(), err.kind().to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::daemon(format!("Malformed JSON-RPC payload: {}", err))
    }
}

impl From<serde_bencode::Error> for ClientError {
    fn from(err: serde_bencode::Error) -> Self {
        ClientError::storage_error_full("Failed to encode torrent metainfo", "unknown".to_string(), err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let address = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        if err.is_decode() {
            ClientError::daemon(format!("Undecodable daemon response: {}", err))
        } else {
            ClientError::connectivity_full("Failed to reach aria2 daemon", address, err.to_string())
        }
    }
}
