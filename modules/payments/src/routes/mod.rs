pub mod payments;
pub mod webhooks;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;

use crate::metrics::Metrics;
use crate::reconciler::Reconciler;

/// Shared state handed to every handler.
pub struct AppState {
    pub db: PgPool,
    pub reconciler: Reconciler,
    pub metrics: Metrics,
    /// Webhook signing secret; `None` disables signature verification.
    pub webhook_secret: Option<String>,
}

/// Build the payments API router.
pub fn payments_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(crate::health::health))
        .route("/api/health/ready", get(crate::health::health_ready))
        .route(
            "/api/payments",
            post(payments::create_payment).get(payments::list_payments),
        )
        .route("/api/payments/{id}", get(payments::get_payment))
        .route("/api/payments/{id}/confirm", post(payments::confirm_payment))
        .route(
            "/api/payments/webhooks/mercadopago",
            post(webhooks::receive_webhook),
        )
        .route("/api/payments/webhooks", get(webhooks::list_webhooks))
        .route("/api/payments/ipn", get(webhooks::receive_ipn))
        .route("/metrics", get(render_metrics))
        .with_state(state)
}

/// GET /metrics - Prometheus text exposition
async fn render_metrics(State(state): State<Arc<AppState>>) -> Result<String, StatusCode> {
    state
        .metrics
        .render()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
