use gluetun::PortFetcher;
use reconciler::Reconciler;
use statusserver::StatusServerApi;
use tokio::sync::watch;
use torrent::{Credential, TorrentApi};

mod config;
mod logging;

use config::Config;
use logging::LogFormat;

const SERVER_HOST: &str = "0.0.0.0";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load environment variables from .env file
    let _ = dotenv::dotenv();

    logging::init_logging(LogFormat::from_env())?;

    let config = Config::from_env()?;

    tracing::info!("Starting qBittorrent Port Sync...");
    tracing::info!("Gluetun: {}", config.gluetun_url);
    tracing::info!("qBittorrent: {}", config.qbittorrent_url);
    tracing::info!("Update interval: {}s", config.update_interval.as_secs());
    tracing::info!("Server port: {}", config.server_port);
    tracing::info!("Gluetun auth: {}", config.gluetun_auth.method_name());

    let vpn = PortFetcher::new(&config.gluetun_url, config.gluetun_auth.clone())?;
    let torrent = TorrentApi::new(
        &config.qbittorrent_url,
        Credential::new(config.qbittorrent_user.as_str(), config.qbittorrent_pass.as_str()),
    )?;

    if torrent.login().await.is_err() {
        tracing::warn!("Initial login failed, will retry on first update");
    }

    let reconciler = Reconciler::new(vpn, torrent, config.update_interval);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sync_loop = tokio::spawn({
        let reconciler = reconciler.clone();
        let shutdown = shutdown_rx.clone();
        async move { reconciler.run(shutdown).await }
    });

    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let server = StatusServerApi::new(reconciler, config.public_dir.clone());
    let served = server.serve(SERVER_HOST, config.server_port, shutdown_rx).await;

    // The loop may still be sleeping when the server fails to bind
    sync_loop.abort();
    let _ = sync_loop.await;

    served
}

/// Resolve on SIGINT, or SIGTERM on unix
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received SIGINT, shutting down...");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("Received SIGTERM, shutting down...");
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
