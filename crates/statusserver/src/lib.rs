//! HTTP status and control surface
//!
//! Serves the sync status, a manual trigger for the reconciliation cycle,
//! a health probe and the static status page.

mod responses;
mod server;

pub use responses::{ForceUpdateResponse, HealthResponse, StatusResponse};
pub use server::StatusServerApi;

/// Result type alias for status server operations
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
