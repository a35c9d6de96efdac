//! Payment record endpoints: creation by the point-of-sale flow, queries,
//! and manual confirmation for counter-settled methods.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    CreatePaymentRequest, ErrorResponse, ListPaymentsQuery, Payment, PaymentStatus,
};
use crate::routes::AppState;

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn db_error(e: sqlx::Error) -> HandlerError {
    tracing::error!("database error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("database_error", e.to_string())),
    )
}

/// POST /api/payments - Register a payment attempt
///
/// Provider-settled methods get an external reference here (generated when
/// the caller does not supply one); that reference is what inbound
/// notifications are correlated against later.
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), HandlerError> {
    if req.amount_cents < 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "amount_cents must be non-negative",
            )),
        ));
    }

    if req.sale_reference.is_empty() || req.branch_id.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "branch_id and sale_reference are required",
            )),
        ));
    }

    let id = Uuid::new_v4();
    let currency = req.currency.unwrap_or_else(|| "ARS".to_string());

    // Manual methods never talk to the provider, so they carry no reference.
    let external_reference = if req.method.is_manual() {
        req.external_reference
    } else {
        req.external_reference
            .or_else(|| Some(format!("pay_{}", Uuid::new_v4().simple())))
    };

    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (
            id, branch_id, sale_reference, method, amount_cents, currency,
            external_reference, provider_order_id, status, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.branch_id)
    .bind(&req.sale_reference)
    .bind(req.method)
    .bind(req.amount_cents)
    .bind(&currency)
    .bind(&external_reference)
    .bind(&req.provider_order_id)
    .fetch_one(&state.db)
    .await
    .map_err(db_error)?;

    tracing::info!(
        payment_id = %payment.id,
        sale_reference = %payment.sale_reference,
        method = ?payment.method,
        "payment registered"
    );

    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET /api/payments/{id} - Fetch a payment record
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, HandlerError> {
    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(db_error)?;

    match payment {
        Some(payment) => Ok(Json(payment)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("not_found", "Payment not found")),
        )),
    }
}

/// GET /api/payments - List payments with optional filters
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPaymentsQuery>,
) -> Result<Json<Vec<Payment>>, HandlerError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0).max(0);

    let payments = sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE ($1::text IS NULL OR sale_reference = $1)
          AND ($2::text IS NULL OR branch_id = $2)
          AND ($3::payments_status IS NULL OR status = $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(&params.sale_reference)
    .bind(&params.branch_id)
    .bind(params.status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await
    .map_err(db_error)?;

    Ok(Json(payments))
}

/// POST /api/payments/{id}/confirm - Manually approve a counter-settled payment
///
/// Only `cash` and `terminal` payments confirm this way; the other methods
/// settle through provider notifications. The transition uses the same
/// `status = 'pending'` guard as the reconciler, so a repeat confirmation
/// (or a confirmation racing a notification) is a conflict, not a rewrite.
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>, HandlerError> {
    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await
        .map_err(db_error)?;

    let Some(payment) = payment else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("not_found", "Payment not found")),
        ));
    };

    if !payment.method.is_manual() {
        state
            .metrics
            .manual_confirmations_total
            .with_label_values(&["rejected"])
            .inc();
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "validation_error",
                "Only cash and terminal payments are confirmed manually",
            )),
        ));
    }

    let updated = sqlx::query_as::<_, Payment>(
        r#"
        UPDATE payments
        SET status = $1, updated_at = NOW()
        WHERE id = $2 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(PaymentStatus::Approved)
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(db_error)?;

    match updated {
        Some(payment) => {
            state
                .metrics
                .manual_confirmations_total
                .with_label_values(&["confirmed"])
                .inc();
            tracing::info!(payment_id = %payment.id, "payment confirmed manually");
            Ok(Json(payment))
        }
        None => {
            state
                .metrics
                .manual_confirmations_total
                .with_label_values(&["conflict"])
                .inc();
            Err((
                StatusCode::CONFLICT,
                Json(ErrorResponse::new(
                    "conflict",
                    "Payment already settled",
                )),
            ))
        }
    }
}
