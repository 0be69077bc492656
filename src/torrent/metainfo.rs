//! Single-file torrent metainfo
//!
//! Used to write `.torrent` descriptors for test payloads and to derive the
//! matching info hash and magnet link.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{ClientError, Result};
use crate::torrent::magnet::MagnetLink;

/// The `info` dictionary of a single-file torrent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// File size in bytes
    pub length: u64,
    /// File name
    pub name: String,
    /// Size of each piece in bytes
    #[serde(rename = "piece length")]
    pub piece_length: u64,
    /// Concatenated 20-byte SHA1 piece hashes
    #[serde(with = "serde_bytes")]
    pub pieces: Vec<u8>,
    /// 1 when DHT and PEX must not be used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<u8>,
}

/// Top-level torrent metainfo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metainfo {
    /// Primary tracker announce URL (absent for trackerless torrents)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "created by", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(rename = "creation date", default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<i64>,
    pub info: Info,
}

impl Metainfo {
    /// Decode a bencoded `.torrent` file
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        serde_bencode::from_bytes(data).map_err(|e| {
            ClientError::invalid_input(format!("Failed to parse torrent metainfo: {}", e))
        })
    }

    /// Encode as a bencoded `.torrent` file
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_bencode::to_bytes(self)?)
    }

    /// SHA1 of the bencoded info dictionary
    pub fn info_hash(&self) -> Result<[u8; 20]> {
        let info_bytes = serde_bencode::to_bytes(&self.info)?;
        let mut hasher = Sha1::new();
        hasher.update(&info_bytes);
        Ok(hasher.finalize().into())
    }

    /// Get info hash as a hex string
    pub fn info_hash_hex(&self) -> Result<String> {
        Ok(hex::encode(self.info_hash()?))
    }

    /// Total payload size in bytes
    pub fn total_size(&self) -> u64 {
        self.info.length
    }

    /// Get number of pieces in torrent
    pub fn piece_count(&self) -> usize {
        self.info.pieces.len() / 20
    }

    /// Get piece hash for a specific piece index
    pub fn piece_hash(&self, index: usize) -> Option<[u8; 20]> {
        let chunk = self.info.pieces.chunks_exact(20).nth(index)?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(chunk);
        Some(hash)
    }

    /// Get byte range for a specific piece
    pub fn piece_range(&self, index: usize) -> Option<(u64, u64)> {
        if index >= self.piece_count() {
            return None;
        }

        let start = (index as u64) * self.info.piece_length;
        let end = std::cmp::min(start + self.info.piece_length, self.total_size());

        Some((start, end))
    }

    /// Magnet link pointing at this torrent
    pub fn magnet_link(&self) -> Result<MagnetLink> {
        let trackers: Vec<String> = self.announce.iter().cloned().collect();
        Ok(MagnetLink::build(&self.info_hash()?, &self.info.name, self.total_size(), &trackers))
    }
}

/// Hash one piece of payload data
pub fn hash_piece(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}
