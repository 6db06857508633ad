//! HTTP server implementation

use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use reconciler::{Reconciler, Trigger};

use crate::responses::{ForceUpdateResponse, HealthResponse, StatusResponse};

#[derive(Clone)]
struct AppState {
    reconciler: Reconciler,
    started_at: Instant,
}

/// Status server API for managing the HTTP server
#[derive(Clone)]
pub struct StatusServerApi {
    state: AppState,
    public_dir: PathBuf,
}

impl StatusServerApi {
    /// Create a new status server
    ///
    /// # Arguments
    /// * `reconciler` - Reconciler whose state is reported and which `/force-update` drives
    /// * `public_dir` - Directory holding the static status page
    pub fn new(reconciler: Reconciler, public_dir: PathBuf) -> Self {
        let state = AppState {
            reconciler,
            started_at: Instant::now(),
        };
        Self { state, public_dir }
    }

    /// Create the axum router with all routes configured
    pub fn router(&self) -> Router {
        Router::new()
            .route("/status", get(status))
            .route("/force-update", get(force_update).post(force_update))
            .route("/health", get(health_check))
            .fallback_service(ServeDir::new(&self.public_dir))
            .with_state(self.state.clone())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start the status server
    ///
    /// # Arguments
    /// * `host` - Host to bind to (e.g., "0.0.0.0")
    /// * `port` - Port to bind to (e.g., 5000)
    /// * `shutdown` - Stops the server once it holds `true`
    pub async fn serve(
        self,
        host: &str,
        port: u16,
        shutdown: watch::Receiver<bool>,
    ) -> crate::Result<()> {
        let addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("HTTP server listening on http://{}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

/// Last synced port and time until the next scheduled cycle
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.reconciler.status().into())
}

/// Run a cycle right away and report the resulting port
async fn force_update(State(state): State<AppState>) -> impl IntoResponse {
    tracing::info!("Force update requested via API");
    let outcome = state.reconciler.trigger(Trigger::Manual).await;
    let port = state.reconciler.state().last_port();
    Json(ForceUpdateResponse::new(outcome, port))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let sync = state.reconciler.state().snapshot();
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        port_found: sync.last_port.is_some(),
        logged_in: state.reconciler.torrent().is_logged_in(),
        update_count: sync.update_count,
    })
}
