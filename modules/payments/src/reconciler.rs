//! Payment status reconciliation.
//!
//! Turns one inbound provider notification into at most one status
//! transition on a persisted payment record: classify the delivery, fetch
//! the full resource when only an id was delivered, translate the provider's
//! status vocabulary into the internal one, and apply it through the store's
//! conditional update. Redelivery and out-of-order arrival are normal here,
//! never errors.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::mercadopago::error::MercadoPagoError;
use crate::mercadopago::merchant_order::MerchantOrderDetail;
use crate::mercadopago::payment::PaymentDetail;
use crate::mercadopago::MercadoPagoClient;
use crate::models::PaymentStatus;
use crate::notification::{classify, Classification, IpnQuery, NotificationEnvelope, ResourceKind};
use crate::store::{ApplyOutcome, CorrelationKey, PaymentStore};

/// Raw statuses the provider reports for settled charges.
const APPROVED_STATUSES: &[&str] = &["approved", "processed", "closed", "accredited"];

/// Raw statuses that definitively fail a charge.
const REJECTED_STATUSES: &[&str] = &["rejected", "cancelled", "cancelled_by_player"];

/// Map a provider status string onto the internal status.
///
/// Unknown vocabulary (including future provider additions) maps to
/// `Pending`: financial state only advances on an explicit, recognized
/// signal.
pub fn translate_status(raw: &str) -> PaymentStatus {
    if APPROVED_STATUSES.contains(&raw) {
        PaymentStatus::Approved
    } else if REJECTED_STATUSES.contains(&raw) {
        PaymentStatus::Rejected
    } else {
        PaymentStatus::Pending
    }
}

/// Retryable reconciliation failure. Ignorable conditions never surface
/// here; they come back as `Reconciliation::Ignored` or `NotFound`.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("gateway error: {0}")]
    Gateway(#[from] MercadoPagoError),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// What a notification amounted to once processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// A pending record matched and was written (a pending signal only
    /// records the provider resource id).
    Applied {
        reference: String,
        status: PaymentStatus,
    },
    /// The record was already terminal; redelivery observed, nothing changed.
    AlreadyTerminal { reference: String },
    /// No record is addressable by any reference in the event.
    NotFound,
    /// Deliberately dropped: unsupported kind, missing ids, or a resource
    /// the provider does not know (yet).
    Ignored(&'static str),
}

impl Reconciliation {
    /// Label used for the audit log and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Reconciliation::Applied { .. } => "applied",
            Reconciliation::AlreadyTerminal { .. } => "already_terminal",
            Reconciliation::NotFound => "not_found",
            Reconciliation::Ignored(_) => "ignored",
        }
    }
}

/// Read side of the provider API the reconciler needs.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn payment_detail(&self, resource_id: &str) -> Result<PaymentDetail, MercadoPagoError>;

    async fn merchant_order_detail(
        &self,
        resource_id: &str,
    ) -> Result<MerchantOrderDetail, MercadoPagoError>;
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn payment_detail(&self, resource_id: &str) -> Result<PaymentDetail, MercadoPagoError> {
        self.get_payment(resource_id).await
    }

    async fn merchant_order_detail(
        &self,
        resource_id: &str,
    ) -> Result<MerchantOrderDetail, MercadoPagoError> {
        self.get_merchant_order(resource_id).await
    }
}

/// What a resource inspection yields: the provider's raw status plus the
/// references available to correlate it back to a record.
#[derive(Debug, Clone)]
struct Extraction {
    raw_status: String,
    reference: Option<String>,
    order_id: Option<String>,
    provider_resource_id: Option<String>,
}

/// Orchestrates classification, detail fetch, status translation, and the
/// conditional application. Constructed once at startup with both
/// collaborators injected; cheap to clone into handlers.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn PaymentStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn PaymentStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Process one inbound notification end to end.
    pub async fn process(
        &self,
        body: &JsonValue,
        query: &IpnQuery,
    ) -> Result<Reconciliation, ReconcileError> {
        let envelope = match classify(body, query) {
            Classification::Event(envelope) => envelope,
            Classification::Ignored(reason) => {
                tracing::warn!(reason, "notification ignored");
                return Ok(Reconciliation::Ignored(reason));
            }
        };

        tracing::info!(
            kind = envelope.kind.as_str(),
            resource_id = %envelope.resource_id,
            "processing notification"
        );

        let extraction = match self.inspect(&envelope, body).await? {
            Some(extraction) => extraction,
            None => {
                // The provider does not know the resource yet (or it belongs
                // to another deployment). Negative result, not an error: the
                // delivery is re-attempted once propagation completes.
                tracing::warn!(
                    kind = envelope.kind.as_str(),
                    resource_id = %envelope.resource_id,
                    "resource not found at provider"
                );
                return Ok(Reconciliation::NotFound);
            }
        };

        let status = translate_status(&extraction.raw_status);

        let key = if let Some(reference) = extraction.reference {
            CorrelationKey::Reference(reference)
        } else if let Some(order_id) = extraction.order_id {
            CorrelationKey::OrderId(order_id)
        } else {
            tracing::warn!(
                kind = envelope.kind.as_str(),
                resource_id = %envelope.resource_id,
                "no correlation reference in event"
            );
            return Ok(Reconciliation::Ignored("no correlation reference in event"));
        };

        let outcome = self
            .store
            .apply_status(&key, status, extraction.provider_resource_id.as_deref())
            .await?;

        match outcome {
            ApplyOutcome::Updated => {
                tracing::info!(
                    reference = key.value(),
                    status = ?status,
                    raw_status = %extraction.raw_status,
                    "payment status applied"
                );
                Ok(Reconciliation::Applied {
                    reference: key.value().to_string(),
                    status,
                })
            }
            ApplyOutcome::AlreadyTerminal => {
                tracing::info!(reference = key.value(), "payment already terminal, no-op");
                Ok(Reconciliation::AlreadyTerminal {
                    reference: key.value().to_string(),
                })
            }
            ApplyOutcome::NotFound => {
                tracing::warn!(reference = key.value(), "no payment record matched");
                Ok(Reconciliation::NotFound)
            }
        }
    }

    /// Resolve the envelope to a raw status and correlation references,
    /// fetching the full resource when the delivery only carried an id.
    /// Returns `None` when the provider does not know the resource.
    async fn inspect(
        &self,
        envelope: &NotificationEnvelope,
        body: &JsonValue,
    ) -> Result<Option<Extraction>, ReconcileError> {
        match envelope.kind {
            ResourceKind::Payment => {
                match self.gateway.payment_detail(&envelope.resource_id).await {
                    Ok(detail) => Ok(Some(Extraction {
                        raw_status: detail.status.clone(),
                        reference: detail.correlation_reference(),
                        order_id: detail.order_id(),
                        provider_resource_id: Some(envelope.resource_id.clone()),
                    })),
                    Err(e) if e.is_not_found() => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            ResourceKind::MerchantOrder => {
                match self.gateway.merchant_order_detail(&envelope.resource_id).await {
                    Ok(detail) => Ok(Some(Extraction {
                        raw_status: detail.status.clone(),
                        reference: detail.correlation_reference(),
                        // The order is its own fallback key.
                        order_id: Some(envelope.resource_id.clone()),
                        provider_resource_id: None,
                    })),
                    Err(e) if e.is_not_found() => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            ResourceKind::Order => {
                // Status and reference are delivered inline; nothing to fetch.
                let raw_status = body
                    .get("status")
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default()
                    .to_string();
                let reference = body
                    .get("external_reference")
                    .and_then(JsonValue::as_str)
                    .filter(|reference| !reference.is_empty())
                    .map(str::to_string);
                Ok(Some(Extraction {
                    raw_status,
                    reference,
                    order_id: Some(envelope.resource_id.clone()),
                    provider_resource_id: Some(envelope.resource_id.clone()),
                }))
            }
        }
    }
}
