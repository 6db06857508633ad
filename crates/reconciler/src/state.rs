//! Sync state shared between the reconciliation loop and the HTTP handlers

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// Everything the reconciliation loop knows about past cycles
#[derive(Debug, Clone)]
pub struct SyncState {
    /// Last port known to be applied in qBittorrent
    pub last_port: Option<u16>,
    /// Wall clock time of the last cycle attempt
    pub last_check: DateTime<Utc>,
    /// Monotonic time of the last cycle attempt
    pub last_check_at: Instant,
    /// Number of cycles started
    pub update_count: u64,
}

impl SyncState {
    fn new() -> Self {
        Self {
            last_port: None,
            last_check: Utc::now(),
            last_check_at: Instant::now(),
            update_count: 0,
        }
    }
}

/// Snapshot served by `/status`
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub current_port: Option<u16>,
    /// Whole seconds until the next scheduled cycle, never negative
    pub next_update_in: u64,
    pub last_check: DateTime<Utc>,
}

/// Cheaply clonable handle to the [`SyncState`]
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<RwLock<SyncState>>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SyncState::new())),
        }
    }

    /// Record a cycle attempt and return its number
    pub(crate) fn begin_cycle(&self) -> u64 {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.last_check = Utc::now();
        state.last_check_at = Instant::now();
        state.update_count += 1;
        state.update_count
    }

    pub(crate) fn record_port(&self, port: u16) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.last_port = Some(port);
    }

    pub fn last_port(&self) -> Option<u16> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).last_port
    }

    pub fn update_count(&self) -> u64 {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).update_count
    }

    pub fn snapshot(&self) -> SyncState {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// When the next scheduled cycle is due
    pub fn next_due(&self, interval: Duration) -> Instant {
        let last_check_at = self.inner.read().unwrap_or_else(|e| e.into_inner()).last_check_at;
        last_check_at
            .checked_add(interval)
            .unwrap_or_else(|| last_check_at + FAR_FUTURE)
    }

    /// Build the `/status` report for a loop running every `interval`
    pub fn status(&self, interval: Duration) -> StatusReport {
        let state = self.snapshot();
        let remaining = interval.saturating_sub(state.last_check_at.elapsed());

        StatusReport {
            current_port: state.last_port,
            next_update_in: round_secs(remaining),
            last_check: state.last_check,
        }
    }
}

/// Stand-in deadline for intervals too large to add to an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn round_secs(duration: Duration) -> u64 {
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    millis.saturating_add(500) / 1000
}
