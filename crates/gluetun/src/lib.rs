//! Gluetun control server client
//!
//! Reads the port forwarded by the VPN provider from the Gluetun sidecar,
//! optionally authenticating with HTTP basic auth or an API key.

mod auth;
mod error;
mod fetcher;

pub use auth::GluetunAuth;
pub use error::{FetchError, Result};
pub use fetcher::{PortFetcher, REQUEST_TIMEOUT};
