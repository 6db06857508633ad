//! The reconciliation cycle and the timer loop driving it

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use gluetun::PortFetcher;
use torrent::TorrentApi;

use crate::state::{SharedState, StatusReport};

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The interval elapsed
    Timer,
    /// Requested through `/force-update`
    Manual,
}

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Gluetun gave no usable port
    NoVpnPort,
    /// qBittorrent preferences could not be read
    TorrentUnavailable,
    /// qBittorrent already listened on the forwarded port
    InSync(u16),
    /// qBittorrent was switched to the forwarded port
    Updated { from: Option<u16>, to: u16 },
    /// qBittorrent refused the new port
    UpdateFailed { port: u16 },
    /// A timer tick found another cycle running
    Skipped,
}

/// Keeps qBittorrent's listening port equal to the forwarded port
///
/// Cloning is cheap and every clone drives the same state and the same
/// cycle lock, so at most one cycle runs at any time.
#[derive(Clone)]
pub struct Reconciler {
    vpn: PortFetcher,
    torrent: TorrentApi,
    state: SharedState,
    interval: Duration,
    cycle_lock: Arc<Mutex<()>>,
}

impl Reconciler {
    /// # Arguments
    /// * `vpn` - Gluetun port fetcher
    /// * `torrent` - qBittorrent session
    /// * `interval` - Time between two scheduled cycles
    pub fn new(vpn: PortFetcher, torrent: TorrentApi, interval: Duration) -> Self {
        Self {
            vpn,
            torrent,
            state: SharedState::new(),
            interval,
            cycle_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn torrent(&self) -> &TorrentApi {
        &self.torrent
    }

    pub fn status(&self) -> StatusReport {
        self.state.status(self.interval)
    }

    /// Run one cycle unless cycles would overlap
    ///
    /// A timer trigger is skipped when a cycle is already running. A manual
    /// trigger waits for the running cycle to finish and then runs its own.
    pub async fn trigger(&self, trigger: Trigger) -> CycleOutcome {
        let _guard = match trigger {
            Trigger::Timer => match self.cycle_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::debug!("Cycle already in progress, skipping scheduled run");
                    return CycleOutcome::Skipped;
                }
            },
            Trigger::Manual => self.cycle_lock.lock().await,
        };

        self.run_cycle().await
    }

    async fn run_cycle(&self) -> CycleOutcome {
        let cycle = self.state.begin_cycle();
        tracing::info!("Checking for VPN port update (#{})...", cycle);

        let port = match self.vpn.forwarded_port().await {
            Ok(port) => port,
            Err(err) => {
                tracing::warn!("No VPN port available, skipping update: {}", err);
                return CycleOutcome::NoVpnPort;
            }
        };

        let mut prefs = match self.torrent.preferences().await {
            Ok(prefs) => prefs,
            Err(err) => {
                tracing::error!("Error getting qBittorrent preferences: {}", err);
                return CycleOutcome::TorrentUnavailable;
            }
        };

        let current = prefs.listen_port();
        if current == Some(port) {
            tracing::info!(
                "Port already set correctly in qBittorrent ({}), skipping update",
                port
            );
            self.state.record_port(port);
            return CycleOutcome::InSync(port);
        }

        tracing::info!("Port needs update: qBittorrent={:?}, VPN={}", current, port);
        match self.torrent.set_listen_port(&mut prefs, port).await {
            Ok(_) => {
                self.state.record_port(port);
                CycleOutcome::Updated {
                    from: current,
                    to: port,
                }
            }
            Err(err) => {
                tracing::error!("Error updating qBittorrent port: {}", err);
                CycleOutcome::UpdateFailed { port }
            }
        }
    }

    /// Run a cycle now and then once per interval until `shutdown` flips
    ///
    /// The next deadline is always measured from the last attempt, so a
    /// manual cycle pushes the next scheduled one back.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Reconciliation loop started, interval {}s",
            self.interval.as_secs()
        );

        let mut outcome = self.trigger(Trigger::Timer).await;
        loop {
            if outcome == CycleOutcome::Skipped {
                // wait out the manual cycle holding the lock
                drop(self.cycle_lock.lock().await);
            }

            let due = self.state.next_due(self.interval);
            tokio::select! {
                _ = tokio::time::sleep_until(due) => {}
                _ = shutdown.changed() => {
                    tracing::info!("Reconciliation loop stopped");
                    return;
                }
            }

            if Instant::now() < self.state.next_due(self.interval) {
                continue;
            }
            outcome = self.trigger(Trigger::Timer).await;
        }
    }
}
