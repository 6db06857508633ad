//! qBittorrent Web API client
//!
//! This crate keeps a cookie-backed session against the qBittorrent Web API
//! and exposes the few calls needed to keep the listening port in sync:
//! login, preference retrieval (with a single re-login on session expiry)
//! and a listening port update that resubmits the whole preference document.

pub mod error;
pub mod preferences;
pub mod torrent;

pub use error::{Result, TorrentError};
pub use preferences::Preferences;
pub use torrent::{Credential, PortUpdate, TorrentApi};
