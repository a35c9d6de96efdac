use thiserror::Error;

#[derive(Error, Debug)]
pub enum MercadoPagoError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("API error (status {status_code}): {message}")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Webhook signature verification failed")]
    WebhookVerificationFailed,
}

impl MercadoPagoError {
    /// Resource does not exist on the provider side. Notifications can
    /// arrive before the resource finishes propagating, so callers treat
    /// this as ignorable rather than retryable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MercadoPagoError::ApiError { status_code: 404, .. })
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        matches!(self, MercadoPagoError::ApiError { status_code, .. } if (500..600).contains(status_code))
    }
}
