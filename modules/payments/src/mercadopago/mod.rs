pub mod error;
pub mod merchant_order;
pub mod payment;
pub mod webhook;

use error::MercadoPagoError;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the Mercado Pago API client
#[derive(Debug, Clone)]
pub struct MercadoPagoConfig {
    pub access_token: String,
    pub base_path: String,
}

impl MercadoPagoConfig {
    pub fn new(access_token: String, base_path: String) -> Self {
        MercadoPagoConfig {
            access_token,
            base_path,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, MercadoPagoError> {
        let access_token = std::env::var("MP_ACCESS_TOKEN")
            .map_err(|_| MercadoPagoError::ConfigError("Missing MP_ACCESS_TOKEN".to_string()))?;

        let base_path = std::env::var("MP_BASE_URL")
            .unwrap_or_else(|_| "https://api.mercadopago.com".to_string());

        Ok(MercadoPagoConfig {
            access_token,
            base_path,
        })
    }
}

/// Read-side Mercado Pago API client (payment and merchant-order lookups)
#[derive(Clone)]
pub struct MercadoPagoClient {
    config: Arc<MercadoPagoConfig>,
    http_client: Client,
}

impl MercadoPagoClient {
    /// Create a new client with the given configuration
    pub fn new(config: MercadoPagoConfig) -> Result<Self, MercadoPagoError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MercadoPagoError::HttpError(e.to_string()))?;

        Ok(MercadoPagoClient {
            config: Arc::new(config),
            http_client,
        })
    }

    /// Create a new client from environment variables
    pub fn from_env() -> Result<Self, MercadoPagoError> {
        let config = MercadoPagoConfig::from_env()?;
        Self::new(config)
    }

    /// Make a GET request to the Mercado Pago API
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, MercadoPagoError> {
        let url = format!("{}{}", self.config.base_path, path);
        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.config.access_token))
            .send()
            .await
            .map_err(|e| MercadoPagoError::HttpError(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Handle HTTP response and convert to appropriate type or error
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, MercadoPagoError> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| MercadoPagoError::ParseError(e.to_string()))
        } else {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            Err(MercadoPagoError::ApiError {
                status_code: status.as_u16(),
                message: error_body,
            })
        }
    }
}
