//! Magnet link validation and construction
//!
//! A magnet link is accepted only when it starts with `magnet:?xt=urn:btih:`
//! followed by exactly 40 hexadecimal characters. The hash ends at the end of
//! the string or at the `&` that introduces the next parameter.

use std::fmt;

use tracing::{debug, warn};
use url::form_urlencoded;

use crate::error::{ClientError, Result};

const MAGNET_PREFIX: &str = "magnet:?xt=urn:btih:";
const HEX_HASH_LEN: usize = 40;

/// A syntactically valid BitTorrent magnet link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    uri: String,
}

impl MagnetLink {
    /// Validate a magnet link string
    ///
    /// # Example
    /// ```ignore
    /// let magnet = MagnetLink::parse("magnet:?xt=urn:btih:dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c")?;
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        if !Self::is_valid(input) {
            warn!("Rejecting malformed magnet link: {}", input);
            return Err(ClientError::invalid_input_with_field(
                "Invalid magnet link format",
                "magnet-link",
            ));
        }

        debug!("Accepted magnet link with info hash {}", &input[MAGNET_PREFIX.len()..MAGNET_PREFIX.len() + HEX_HASH_LEN]);
        Ok(Self { uri: input.to_string() })
    }

    /// Check whether a string is a well-formed magnet link
    pub fn is_valid(input: &str) -> bool {
        let Some(rest) = input.strip_prefix(MAGNET_PREFIX) else {
            return false;
        };

        let hash = rest.split('&').next().unwrap_or_default();
        hash.len() == HEX_HASH_LEN && hash.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Build a magnet link for a known info hash
    pub fn build(info_hash: &[u8; 20], name: &str, size: u64, trackers: &[String]) -> Self {
        let mut uri = format!("{}{}", MAGNET_PREFIX, hex::encode(info_hash));

        uri.push_str("&dn=");
        uri.extend(form_urlencoded::byte_serialize(name.as_bytes()));
        uri.push_str(&format!("&xl={}", size));

        for tracker in trackers {
            uri.push_str("&tr=");
            uri.extend(form_urlencoded::byte_serialize(tracker.as_bytes()));
        }

        Self { uri }
    }

    /// Lowercase hex info hash carried by the link
    pub fn info_hash_hex(&self) -> String {
        self.uri[MAGNET_PREFIX.len()..MAGNET_PREFIX.len() + HEX_HASH_LEN].to_ascii_lowercase()
    }

    /// The full URI
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for MagnetLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}
