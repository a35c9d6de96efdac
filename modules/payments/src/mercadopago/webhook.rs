use super::error::MercadoPagoError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Verify a Mercado Pago webhook signature
///
/// The provider sends an `x-signature` header of the form `ts=...,v1=...`
/// where `v1` is the hex HMAC-SHA256 of the manifest
/// `id:<data_id>;request-id:<request_id>;ts:<ts>;`.
///
/// # Arguments
///
/// * `data_id` - The resource id delivered in the notification (`data.id`)
/// * `request_id` - The `x-request-id` header value
/// * `signature` - The `x-signature` header value
/// * `webhook_secret` - The signing secret from the provider dashboard
/// * `tolerance` - Maximum allowed timestamp age in seconds (default: 300)
///
/// # Returns
///
/// * `Ok(())` if the signature is valid
/// * `Err(MercadoPagoError::WebhookVerificationFailed)` otherwise
pub fn verify_webhook_signature(
    data_id: &str,
    request_id: &str,
    signature: &str,
    webhook_secret: &str,
    tolerance: Option<i64>,
) -> Result<(), MercadoPagoError> {
    let tolerance = tolerance.unwrap_or(300);

    // Parse signature header
    let parts: Vec<&str> = signature.split(',').collect();

    let timestamp_part = parts
        .iter()
        .map(|p| p.trim())
        .find(|p| p.starts_with("ts="))
        .ok_or(MercadoPagoError::WebhookVerificationFailed)?;

    let signature_part = parts
        .iter()
        .map(|p| p.trim())
        .find(|p| p.starts_with("v1="))
        .ok_or(MercadoPagoError::WebhookVerificationFailed)?;

    let timestamp = timestamp_part
        .strip_prefix("ts=")
        .ok_or(MercadoPagoError::WebhookVerificationFailed)?;

    let received_signature = signature_part
        .strip_prefix("v1=")
        .ok_or(MercadoPagoError::WebhookVerificationFailed)?;

    // Check timestamp tolerance (prevent replay attacks)
    let webhook_time = timestamp
        .parse::<i64>()
        .map_err(|_| MercadoPagoError::WebhookVerificationFailed)?;

    let current_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| MercadoPagoError::WebhookVerificationFailed)?
        .as_secs() as i64;

    if (current_time - webhook_time).abs() > tolerance {
        return Err(MercadoPagoError::WebhookVerificationFailed);
    }

    // Calculate expected signature over the documented manifest template
    let manifest = format!("id:{};request-id:{};ts:{};", data_id, request_id, timestamp);

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| MercadoPagoError::WebhookVerificationFailed)?;

    mac.update(manifest.as_bytes());

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    let received_bytes = hex::decode(received_signature)
        .map_err(|_| MercadoPagoError::WebhookVerificationFailed)?;
    let expected_bytes = hex::decode(&expected_signature)
        .map_err(|_| MercadoPagoError::WebhookVerificationFailed)?;

    if received_bytes.len() != expected_bytes.len() {
        return Err(MercadoPagoError::WebhookVerificationFailed);
    }

    // Constant-time comparison
    let mut result = 0u8;
    for (a, b) in received_bytes.iter().zip(expected_bytes.iter()) {
        result |= a ^ b;
    }

    if result == 0 {
        Ok(())
    } else {
        Err(MercadoPagoError::WebhookVerificationFailed)
    }
}
