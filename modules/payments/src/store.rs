//! Persistence port for payment records.
//!
//! The reconciler touches the payment table through exactly one narrow
//! operation: a conditional update addressed by correlation key. Everything
//! else (creation, listing, manual confirmation) belongs to the HTTP layer.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::PaymentStatus;

/// Correlation key used to locate the payment a notification belongs to.
///
/// The reference handed to the provider at creation time is the primary key;
/// the provider-assigned order id is only consulted when the event carries
/// no reference at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationKey {
    Reference(String),
    OrderId(String),
}

impl CorrelationKey {
    pub fn value(&self) -> &str {
        match self {
            CorrelationKey::Reference(value) | CorrelationKey::OrderId(value) => value,
        }
    }
}

/// Result of a conditional status application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A pending record matched and was written.
    Updated,
    /// The record exists but already reached a terminal status; no-op.
    AlreadyTerminal,
    /// No record is addressable by the given key. Normal for notifications
    /// that arrive before the record propagates.
    NotFound,
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Apply `status` to the record addressed by `key`, only if the record
    /// is still pending, persisting the provider's resource id on first
    /// match. Must be atomic with respect to concurrent deliveries for the
    /// same record.
    async fn apply_status(
        &self,
        key: &CorrelationKey,
        status: PaymentStatus,
        provider_resource_id: Option<&str>,
    ) -> Result<ApplyOutcome, sqlx::Error>;
}

/// Postgres-backed payment store.
#[derive(Clone)]
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn apply_status(
        &self,
        key: &CorrelationKey,
        status: PaymentStatus,
        provider_resource_id: Option<&str>,
    ) -> Result<ApplyOutcome, sqlx::Error> {
        // Single conditional update: only pending rows transition, so two
        // concurrent deliveries for the same record cannot both pass the
        // terminal-state check. Whichever commits first wins.
        let updated = match key {
            CorrelationKey::Reference(reference) => {
                sqlx::query(
                    r#"
                    UPDATE payments
                    SET status = $1,
                        provider_resource_id = COALESCE($2, provider_resource_id),
                        updated_at = NOW()
                    WHERE external_reference = $3 AND status = 'pending'
                    "#,
                )
                .bind(status)
                .bind(provider_resource_id)
                .bind(reference)
                .execute(&self.pool)
                .await?
            }
            CorrelationKey::OrderId(order_id) => {
                sqlx::query(
                    r#"
                    UPDATE payments
                    SET status = $1,
                        provider_resource_id = COALESCE($2, provider_resource_id),
                        updated_at = NOW()
                    WHERE provider_order_id = $3 AND status = 'pending'
                    "#,
                )
                .bind(status)
                .bind(provider_resource_id)
                .bind(order_id)
                .execute(&self.pool)
                .await?
            }
        };

        if updated.rows_affected() > 0 {
            return Ok(ApplyOutcome::Updated);
        }

        // Nothing transitioned: either the record already reached a terminal
        // status (redelivery) or it does not exist yet (early notification).
        let existing: Option<PaymentStatus> = match key {
            CorrelationKey::Reference(reference) => {
                sqlx::query_scalar("SELECT status FROM payments WHERE external_reference = $1")
                    .bind(reference)
                    .fetch_optional(&self.pool)
                    .await?
            }
            CorrelationKey::OrderId(order_id) => {
                sqlx::query_scalar("SELECT status FROM payments WHERE provider_order_id = $1")
                    .bind(order_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        match existing {
            Some(_) => Ok(ApplyOutcome::AlreadyTerminal),
            None => Ok(ApplyOutcome::NotFound),
        }
    }
}
