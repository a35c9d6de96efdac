use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Internal payment status.
///
/// `approved` and `rejected` are terminal: once a record reaches either, no
/// later notification may change it. Every transition in the codebase goes
/// through a conditional update guarded by `status = 'pending'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payments_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// Payment channel. `cash` and `terminal` are settled at the counter and
/// confirmed manually; the remaining methods settle through the provider and
/// receive notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payments_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Wallet,
    Terminal,
}

impl PaymentMethod {
    /// Methods that never receive provider webhooks and are approved at the
    /// register instead.
    pub fn is_manual(self) -> bool {
        matches!(self, PaymentMethod::Cash | PaymentMethod::Terminal)
    }
}

/// Payment record from the payments table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub branch_id: String,
    pub sale_reference: String,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub currency: String,
    pub external_reference: Option<String>,
    pub provider_order_id: Option<String>,
    pub provider_resource_id: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for registering a payment attempt.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub branch_id: String,
    pub sale_reference: String,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub currency: Option<String>,
    pub external_reference: Option<String>,
    pub provider_order_id: Option<String>,
}

/// Query parameters for listing payments.
#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub sale_reference: Option<String>,
    pub branch_id: Option<String>,
    pub status: Option<PaymentStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Received-notification record from the payment_webhooks table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebhookRecord {
    pub id: i32,
    pub branch_id: Option<String>,
    pub event_kind: String,
    pub resource_id: Option<String>,
    pub outcome: String,
    pub payload: Option<JsonValue>,
    pub received_at: DateTime<Utc>,
}

/// Query parameters for listing received notifications.
#[derive(Debug, Deserialize)]
pub struct ListWebhooksQuery {
    pub event_kind: Option<String>,
    pub outcome: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Standard error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
