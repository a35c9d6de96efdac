use super::error::MercadoPagoError;
use super::MercadoPagoClient;
use serde::Deserialize;

/// Merchant order resource returned by GET /merchant_orders/{id}.
#[derive(Debug, Clone, Deserialize)]
pub struct MerchantOrderDetail {
    pub id: i64,
    /// Lifecycle status of the order itself: opened, closed, expired.
    pub status: String,
    #[serde(default)]
    pub external_reference: Option<String>,
}

impl MerchantOrderDetail {
    pub fn correlation_reference(&self) -> Option<String> {
        match &self.external_reference {
            Some(reference) if !reference.is_empty() => Some(reference.clone()),
            _ => None,
        }
    }
}

impl MercadoPagoClient {
    /// Fetch a merchant order resource by id
    pub async fn get_merchant_order(
        &self,
        order_id: &str,
    ) -> Result<MerchantOrderDetail, MercadoPagoError> {
        let path = format!("/merchant_orders/{}", order_id);
        self.get(&path).await
    }
}
