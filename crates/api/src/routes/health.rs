use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(healthz))
}

async fn root() -> &'static str {
    "scanner is running"
}

async fn health() -> &'static str {
    "ok"
}

/// Liveness plus per-scanner state. No auth required.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let strategies: Vec<Value> = state
        .scans
        .iter()
        .map(|s| {
            json!({
                "name": s.name,
                "strategy": s.strategy.to_string(),
                "scanning": s.is_scanning(),
            })
        })
        .collect();

    Json(json!({
        "status": "ok",
        "started_at": state.started_at.to_rfc3339(),
        "strategies": strategies,
    }))
}
