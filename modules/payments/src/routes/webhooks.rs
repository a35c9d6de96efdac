//! Provider notification endpoints.
//!
//! Acknowledgment policy: processed and deliberately-ignored events ack 200.
//! Events that match no record ack 404 so the provider retries once its
//! resource has propagated. Retryable failures surface 502 and ride the
//! provider's retry loop. A deployment that prefers to starve hostile retry
//! storms can collapse the 502 branch into a 200 ack, at the cost of hiding
//! real outages from that loop; that is an operational decision, made here
//! and nowhere else.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::mercadopago::webhook::verify_webhook_signature;
use crate::models::{ErrorResponse, ListWebhooksQuery, WebhookRecord};
use crate::notification::IpnQuery;
use crate::reconciler::Reconciliation;
use crate::routes::AppState;

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// POST /api/payments/webhooks/mercadopago - Receive a provider webhook
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IpnQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HandlerError> {
    let payload: JsonValue = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("failed to parse webhook payload: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "parse_error",
                format!("Failed to parse webhook: {}", e),
            )),
        )
    })?;

    // Verify signature when a secret is configured; development and test
    // setups run without one.
    if let Some(secret) = &state.webhook_secret {
        let signature = headers
            .get("x-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let request_id = headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        // The signed manifest covers the query-delivered resource id.
        let data_id = query
            .data_id
            .clone()
            .or_else(|| {
                payload
                    .get("data")
                    .and_then(|data| data.get("id"))
                    .map(|id| match id {
                        JsonValue::String(s) => s.clone(),
                        other => other.to_string(),
                    })
            })
            .unwrap_or_default();

        if let Err(e) = verify_webhook_signature(&data_id, request_id, signature, secret, None) {
            tracing::warn!("webhook signature verification failed: {}", e);
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("signature_error", e.to_string())),
            ));
        }
    }

    process_and_ack(&state, payload, query).await
}

/// GET /api/payments/ipn - Receive an instant-notification redirect
///
/// The synchronous delivery carries no body; everything lives in the query
/// string.
pub async fn receive_ipn(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IpnQuery>,
) -> Result<StatusCode, HandlerError> {
    process_and_ack(&state, JsonValue::Null, query).await
}

/// Run the reconciler and translate its outcome into an acknowledgment.
async fn process_and_ack(
    state: &AppState,
    payload: JsonValue,
    query: IpnQuery,
) -> Result<StatusCode, HandlerError> {
    let kind_label = declared_kind(&payload, &query);
    let result = state.reconciler.process(&payload, &query).await;

    let outcome_label = match &result {
        Ok(reconciliation) => reconciliation.outcome(),
        Err(_) => "error",
    };
    state
        .metrics
        .notifications_total
        .with_label_values(&[kind_label.as_str(), outcome_label])
        .inc();
    record_webhook(state, &kind_label, outcome_label, &payload, &query);

    match result {
        Ok(Reconciliation::Applied { .. })
        | Ok(Reconciliation::AlreadyTerminal { .. })
        | Ok(Reconciliation::Ignored(_)) => Ok(StatusCode::OK),
        Ok(Reconciliation::NotFound) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "not_matched",
                "No payment record matched the notification",
            )),
        )),
        Err(e) => {
            tracing::error!("reconciliation failed: {}", e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new("reconcile_error", e.to_string())),
            ))
        }
    }
}

/// GET /api/payments/webhooks - List received notifications
pub async fn list_webhooks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListWebhooksQuery>,
) -> Result<Json<Vec<WebhookRecord>>, HandlerError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);

    let records = sqlx::query_as::<_, WebhookRecord>(
        r#"
        SELECT * FROM payment_webhooks
        WHERE ($1::text IS NULL OR event_kind = $1)
          AND ($2::text IS NULL OR outcome = $2)
        ORDER BY received_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(&params.event_kind)
    .bind(&params.outcome)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("database error: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("database_error", e.to_string())),
        )
    })?;

    Ok(Json(records))
}

/// Declared kind of the delivery, for the audit log and metrics. Falls back
/// to "unknown" rather than re-running classification.
fn declared_kind(payload: &JsonValue, query: &IpnQuery) -> String {
    payload
        .get("type")
        .and_then(JsonValue::as_str)
        .or_else(|| payload.get("topic").and_then(JsonValue::as_str))
        .or(query.topic.as_deref())
        .unwrap_or("unknown")
        .to_string()
}

/// Append to the received-notification log (fire-and-forget: a failed
/// insert never fails the notification).
fn record_webhook(
    state: &AppState,
    kind: &str,
    outcome: &str,
    payload: &JsonValue,
    query: &IpnQuery,
) {
    let db = state.db.clone();
    let kind = kind.to_string();
    let outcome = outcome.to_string();
    let branch = query.branch.clone();
    let resource_id = query.data_id.clone().or_else(|| query.id.clone()).or_else(|| {
        payload
            .get("data")
            .and_then(|data| data.get("id"))
            .map(|id| match id {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
    });
    let stored_payload = if payload.is_null() {
        None
    } else {
        Some(payload.clone())
    };

    tokio::spawn(async move {
        let _ = sqlx::query(
            r#"
            INSERT INTO payment_webhooks
                (branch_id, event_kind, resource_id, outcome, payload, received_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(&branch)
        .bind(&kind)
        .bind(&resource_id)
        .bind(&outcome)
        .bind(&stored_payload)
        .execute(&db)
        .await;
    });
}
