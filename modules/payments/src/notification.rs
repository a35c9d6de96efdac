//! Inbound notification classification.
//!
//! The provider delivers events in several wire shapes: an asynchronous
//! webhook POST whose JSON body may carry `type`, `action` or `topic`
//! alongside `data.id`, `id` or `payment.id`, and a synchronous
//! instant-notification GET redirect that only carries query parameters.
//! This module normalizes all of them into a single envelope before any
//! reconciliation logic runs.

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Canonical resource kinds the reconciler knows how to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Payment,
    MerchantOrder,
    Order,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Payment => "payment",
            ResourceKind::MerchantOrder => "merchant_order",
            ResourceKind::Order => "order",
        }
    }
}

/// Normalized notification: which resource to inspect and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEnvelope {
    pub kind: ResourceKind,
    pub resource_id: String,
}

/// Outcome of classification.
///
/// `Ignored` is a deliberate no-op acknowledgment, not an error: the
/// provider retries on any non-2xx, so malformed or irrelevant deliveries
/// must be dropped quietly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Event(NotificationEnvelope),
    Ignored(&'static str),
}

/// Query parameters of the instant-notification redirect.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct IpnQuery {
    pub topic: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "data.id")]
    pub data_id: Option<String>,
    pub preference_id: Option<String>,
    /// Tenant scoping: which branch of the deployment the notification
    /// belongs to. Informational; correlation runs on the reference.
    pub branch: Option<String>,
}

/// Resolve an inbound delivery to a processable envelope.
///
/// The declared kind is looked for in `type`, then `action`, then `topic`
/// (body), then the query string. A body with no declared kind but a
/// `payment.id` or `intent_type` field is a direct payment-intent delivery
/// and defaults to `Payment`.
pub fn classify(body: &JsonValue, query: &IpnQuery) -> Classification {
    let declared = body
        .get("type")
        .and_then(JsonValue::as_str)
        .or_else(|| body.get("action").and_then(JsonValue::as_str))
        .or_else(|| body.get("topic").and_then(JsonValue::as_str))
        .or(query.topic.as_deref());

    let kind = match declared {
        Some(raw) => match parse_kind(raw) {
            Some(kind) => kind,
            None => return Classification::Ignored("unsupported event kind"),
        },
        None => {
            if body.get("payment").is_some() || body.get("intent_type").is_some() {
                ResourceKind::Payment
            } else {
                return Classification::Ignored("no event kind declared");
            }
        }
    };

    let resource_id = body
        .get("data")
        .and_then(|data| data.get("id"))
        .and_then(id_string)
        .or_else(|| body.get("id").and_then(id_string))
        .or_else(|| {
            body.get("payment")
                .and_then(|payment| payment.get("id"))
                .and_then(id_string)
        })
        .or_else(|| query.data_id.clone())
        .or_else(|| query.id.clone());

    match resource_id {
        Some(resource_id) if !resource_id.is_empty() => {
            Classification::Event(NotificationEnvelope { kind, resource_id })
        }
        _ => Classification::Ignored("no resource id in notification"),
    }
}

/// Map a declared kind string onto a resource kind. `action` values arrive
/// as dotted pairs ("payment.updated"), so prefixes count.
fn parse_kind(raw: &str) -> Option<ResourceKind> {
    if raw == "payment" || raw.starts_with("payment.") {
        Some(ResourceKind::Payment)
    } else if raw == "merchant_order" {
        Some(ResourceKind::MerchantOrder)
    } else if raw == "order" || raw.starts_with("order.") {
        Some(ResourceKind::Order)
    } else {
        None
    }
}

/// Resource ids arrive as strings or numbers depending on the wire shape.
fn id_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
