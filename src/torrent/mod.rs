//! Torrent locators and descriptors
//!
//! Magnet link validation plus the small amount of metainfo handling needed
//! to synthesize test torrents.

pub mod magnet;
pub mod metainfo;

pub use magnet::MagnetLink;
pub use metainfo::{Info, Metainfo};
