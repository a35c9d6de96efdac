use std::env;

/// Application configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Bearer token for the provider's read API. Required: a deployment
    /// without credentials must fail at startup, not per-notification.
    pub mp_access_token: String,
    pub mp_base_url: String,
    /// Webhook signing secret. When unset, signature verification is skipped
    /// (development and test setups).
    pub mp_webhook_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8094".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let mp_access_token = env::var("MP_ACCESS_TOKEN")
            .map_err(|_| "MP_ACCESS_TOKEN must be set".to_string())?;

        let mp_base_url = env::var("MP_BASE_URL")
            .unwrap_or_else(|_| "https://api.mercadopago.com".to_string());

        let mp_webhook_secret = env::var("MP_WEBHOOK_SECRET").ok();

        Ok(Config {
            database_url,
            host,
            port,
            mp_access_token,
            mp_base_url,
            mp_webhook_secret,
        })
    }
}
