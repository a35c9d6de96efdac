use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use payments_rs::config::Config;
use payments_rs::mercadopago::{MercadoPagoClient, MercadoPagoConfig};
use payments_rs::metrics::Metrics;
use payments_rs::routes::{payments_router, AppState};
use payments_rs::{db, PgPaymentStore, Reconciler};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting payments service...");

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, provider={}",
        config.host,
        config.port,
        config.mp_base_url
    );

    // Database connection
    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Provider client and reconciler wiring
    let gateway = MercadoPagoClient::new(MercadoPagoConfig::new(
        config.mp_access_token.clone(),
        config.mp_base_url.clone(),
    ))
    .expect("Failed to build Mercado Pago client");

    let reconciler = Reconciler::new(
        Arc::new(PgPaymentStore::new(pool.clone())),
        Arc::new(gateway),
    );

    let state = Arc::new(AppState {
        db: pool,
        reconciler,
        metrics: Metrics::new(),
        webhook_secret: config.mp_webhook_secret.clone(),
    });

    // Build the application router
    let app = payments_router(state).layer(
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    );

    // Bind to the configured address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Payments service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    // Start the server
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
