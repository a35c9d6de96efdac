use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::routes::AppState;

/// Liveness probe: the process is up.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "payments-rs",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: the payment store is reachable.
pub async fn health_ready(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, StatusCode> {
    sqlx::query("SELECT 1")
        .fetch_one(&state.db)
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(json!({
        "status": "ready",
        "database": "connected"
    })))
}
