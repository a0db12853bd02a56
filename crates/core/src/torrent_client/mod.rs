//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait over the backing download
//! service. The only production backend is qBittorrent's Web API.

mod qbittorrent;
mod types;

pub use qbittorrent::QBittorrentClient;
pub use types::*;
