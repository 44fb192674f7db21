pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tracing::info;

use common::{Result, ScanStatus};

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    /// One entry per running scanner.
    pub scans: Arc<Vec<ScanStatus>>,
}

impl AppState {
    pub fn new(scans: Vec<ScanStatus>) -> Self {
        Self {
            started_at: Utc::now(),
            scans: Arc::new(scans),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_router())
        .with_state(state)
}

/// Build and run the liveness server. Returns only on bind or serve failure.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "Health endpoint listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
