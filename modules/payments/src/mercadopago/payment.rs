use super::error::MercadoPagoError;
use super::MercadoPagoClient;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Payment resource returned by GET /v1/payments/{id}.
///
/// Only the fields the reconciler needs are modeled; the provider sends many
/// more.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentDetail {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub metadata: Option<JsonValue>,
    #[serde(default)]
    pub additional_info: Option<JsonValue>,
    #[serde(default)]
    pub order: Option<OrderRef>,
}

/// Owning order of a payment, when the charge was created through one.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRef {
    pub id: Option<i64>,
    #[serde(rename = "type", default)]
    pub order_type: Option<String>,
}

impl PaymentDetail {
    /// Correlation reference, checked across the three places the provider
    /// may put it: the primary field, then metadata, then additional_info.
    pub fn correlation_reference(&self) -> Option<String> {
        if let Some(reference) = &self.external_reference {
            if !reference.is_empty() {
                return Some(reference.clone());
            }
        }

        if let Some(reference) = nested_reference(self.metadata.as_ref()) {
            return Some(reference);
        }

        nested_reference(self.additional_info.as_ref())
    }

    /// Provider order id owning this charge, as a string key.
    pub fn order_id(&self) -> Option<String> {
        self.order.as_ref()?.id.map(|id| id.to_string())
    }
}

fn nested_reference(value: Option<&JsonValue>) -> Option<String> {
    let reference = value?.get("external_reference")?.as_str()?;
    if reference.is_empty() {
        None
    } else {
        Some(reference.to_string())
    }
}

impl MercadoPagoClient {
    /// Fetch a payment resource by id
    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentDetail, MercadoPagoError> {
        let path = format!("/v1/payments/{}", payment_id);
        self.get(&path).await
    }
}
