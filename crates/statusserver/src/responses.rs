//! JSON bodies returned by the status server

use chrono::SecondsFormat;
use reconciler::{CycleOutcome, StatusReport};
use serde::Serialize;

/// Body of `GET /status`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub current_port: Option<u16>,
    pub next_update_in: u64,
    /// ISO-8601, UTC, millisecond precision
    pub last_check: String,
}

impl From<StatusReport> for StatusResponse {
    fn from(report: StatusReport) -> Self {
        Self {
            current_port: report.current_port,
            next_update_in: report.next_update_in,
            last_check: report
                .last_check
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Body of `/force-update`
#[derive(Debug, Serialize)]
pub struct ForceUpdateResponse {
    pub success: bool,
    pub message: String,
    pub port: Option<u16>,
}

impl ForceUpdateResponse {
    pub fn new(outcome: CycleOutcome, port: Option<u16>) -> Self {
        Self {
            success: true,
            message: describe(outcome),
            port,
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub port_found: bool,
    pub logged_in: bool,
    pub update_count: u64,
}

fn describe(outcome: CycleOutcome) -> String {
    match outcome {
        CycleOutcome::NoVpnPort => "Update cycle triggered: no VPN port available".to_string(),
        CycleOutcome::TorrentUnavailable => {
            "Update cycle triggered: qBittorrent preferences unavailable".to_string()
        }
        CycleOutcome::InSync(port) => format!("Update cycle triggered: port {} already set", port),
        CycleOutcome::Updated { to, .. } => format!("Update cycle triggered: port updated to {}", to),
        CycleOutcome::UpdateFailed { port } => {
            format!("Update cycle triggered: failed to set port {}", port)
        }
        CycleOutcome::Skipped => "Update cycle skipped: another cycle is running".to_string(),
    }
}
