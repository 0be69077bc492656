//! Test torrent fixtures
//!
//! Writes a random payload, the matching single-file `.torrent` descriptor
//! and its magnet link into a fresh `torrentp_test_*` directory, for
//! end-to-end runs against a seeding client.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::torrent::metainfo::hash_piece;
use crate::torrent::{Info, Metainfo};

/// Name prefix of every fixture directory; cleanup refuses anything else
pub const FIXTURE_DIR_PREFIX: &str = "torrentp_test_";

/// 32 KiB pieces
pub const DEFAULT_PIECE_SIZE: u64 = 32 * 1024;

const MIN_PIECE_SIZE: u64 = 16 * 1024;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Parameters for one fixture
#[derive(Debug, Clone)]
pub struct FixtureOptions {
    pub size_mb: u64,
    pub piece_size: u64,
    /// Announce to `udp://127.0.0.1:<port>/announce`; trackerless when None
    pub tracker_port: Option<u16>,
    /// Directory the fixture directory is created in
    pub base_dir: PathBuf,
    /// Also write the magnet link to this file
    pub magnet_file: Option<PathBuf>,
}

impl FixtureOptions {
    pub fn new(size_mb: u64) -> Self {
        Self {
            size_mb,
            piece_size: DEFAULT_PIECE_SIZE,
            tracker_port: None,
            base_dir: std::env::temp_dir(),
            magnet_file: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.size_mb == 0 {
            return Err(ClientError::invalid_input_with_field("Size must be at least 1 MB", "size"));
        }
        if self.size_mb.checked_mul(BYTES_PER_MB).is_none() {
            return Err(ClientError::invalid_input_with_field(
                format!("Size of {} MB is too large", self.size_mb),
                "size",
            ));
        }
        if self.piece_size < MIN_PIECE_SIZE || !self.piece_size.is_power_of_two() {
            return Err(ClientError::invalid_input_with_field(
                format!("Piece size must be a power of two of at least {} bytes", MIN_PIECE_SIZE),
                "piece-size",
            ));
        }
        if self.tracker_port == Some(0) {
            return Err(ClientError::invalid_input_with_field("Tracker port cannot be 0", "tracker-port"));
        }
        Ok(())
    }

    /// Only meaningful after `validate`
    fn size_bytes(&self) -> u64 {
        self.size_mb.saturating_mul(BYTES_PER_MB)
    }

    fn announce(&self) -> Option<String> {
        self.tracker_port.map(|port| format!("udp://127.0.0.1:{}/announce", port))
    }
}

/// A generated fixture, printed as JSON by the fixture tool
#[derive(Debug, Clone, Serialize)]
pub struct Fixture {
    pub file: PathBuf,
    pub torrent: PathBuf,
    pub magnet: String,
    pub size_bytes: u64,
    pub info_hash: String,
}

impl Fixture {
    /// Directory holding the payload and descriptor
    pub fn dir(&self) -> Option<&Path> {
        self.file.parent()
    }
}

/// Generate a payload, its descriptor and magnet link
pub async fn create(options: &FixtureOptions) -> Result<Fixture> {
    options.validate()?;

    let dir = options
        .base_dir
        .join(format!("{}{}", FIXTURE_DIR_PREFIX, hex::encode(rand::random::<[u8; 6]>())));
    fs::create_dir_all(&dir).await.map_err(|e| {
        ClientError::storage_error_full("Failed to create fixture directory", dir.display().to_string(), e.to_string())
    })?;

    let name = format!("test_file_{}mb.bin", options.size_mb);
    let file = dir.join(&name);
    info!("Writing {} MB of random data to {}", options.size_mb, file.display());
    let pieces = write_payload(&file, options.size_bytes(), options.piece_size).await?;

    let metainfo = Metainfo {
        announce: options.announce(),
        comment: Some(format!("Test torrent - {}MB", options.size_mb)),
        created_by: Some(concat!("downpore-fixture/", env!("CARGO_PKG_VERSION")).to_string()),
        creation_date: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs() as i64),
        info: Info {
            length: options.size_bytes(),
            name: name.clone(),
            piece_length: options.piece_size,
            pieces,
            private: None,
        },
    };

    let torrent = file.with_extension("torrent");
    fs::write(&torrent, metainfo.to_bytes()?).await.map_err(|e| {
        ClientError::storage_error_full("Failed to write torrent file", torrent.display().to_string(), e.to_string())
    })?;

    let magnet = metainfo.magnet_link()?;
    if let Some(path) = &options.magnet_file {
        fs::write(path, format!("{}\n", magnet)).await.map_err(|e| {
            ClientError::storage_error_full("Failed to write magnet file", path.display().to_string(), e.to_string())
        })?;
        debug!("Magnet link written to {}", path.display());
    }

    let fixture = Fixture {
        file,
        torrent,
        magnet: magnet.to_string(),
        size_bytes: options.size_bytes(),
        info_hash: metainfo.info_hash_hex()?,
    };
    info!("Created fixture {} ({})", fixture.info_hash, fixture.torrent.display());
    Ok(fixture)
}

/// Write `size` random bytes, returning the concatenated piece hashes
async fn write_payload(path: &Path, size: u64, piece_size: u64) -> Result<Vec<u8>> {
    let mut out = fs::File::create(path).await.map_err(|e| {
        ClientError::storage_error_full("Failed to create payload file", path.display().to_string(), e.to_string())
    })?;

    let mut pieces = Vec::with_capacity(size.div_ceil(piece_size) as usize * 20);
    let mut buffer = vec![0u8; piece_size as usize];
    let mut remaining = size;

    while remaining > 0 {
        let len = remaining.min(piece_size) as usize;
        let chunk = &mut buffer[..len];
        rand::thread_rng().fill_bytes(chunk);
        pieces.extend_from_slice(&hash_piece(chunk));
        out.write_all(chunk).await?;
        remaining -= len as u64;
    }

    out.flush().await?;
    debug!("Wrote {} pieces to {}", pieces.len() / 20, path.display());
    Ok(pieces)
}

/// Remove the fixture directory containing `file`
///
/// Accepts either a file inside the fixture directory or the directory
/// itself. Returns false when there was nothing to remove; directories not
/// named `torrentp_test_*` are refused.
pub async fn cleanup(file: &Path) -> Result<bool> {
    let dir = if is_fixture_dir(file) { Some(file) } else { file.parent() };
    let Some(dir) = dir.filter(|d| is_fixture_dir(d)) else {
        return Err(ClientError::invalid_input(format!(
            "Refusing to remove {}: not inside a {}* directory",
            file.display(),
            FIXTURE_DIR_PREFIX
        )));
    };

    if !dir.exists() {
        warn!("Fixture directory {} does not exist", dir.display());
        return Ok(false);
    }

    fs::remove_dir_all(dir).await.map_err(|e| {
        ClientError::storage_error_full("Failed to remove fixture directory", dir.display().to_string(), e.to_string())
    })?;
    info!("Removed fixture directory {}", dir.display());
    Ok(true)
}

fn is_fixture_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(FIXTURE_DIR_PREFIX))
}
