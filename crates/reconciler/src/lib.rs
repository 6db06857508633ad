//! Forwarded port reconciliation
//!
//! Periodically compares the port forwarded by Gluetun with the port
//! qBittorrent listens on and updates qBittorrent when they differ.

mod reconciler;
mod state;

pub use reconciler::{CycleOutcome, Reconciler, Trigger};
pub use state::{SharedState, StatusReport, SyncState};
