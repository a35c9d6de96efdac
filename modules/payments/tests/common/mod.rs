use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use payments_rs::mercadopago::error::MercadoPagoError;
use payments_rs::mercadopago::merchant_order::MerchantOrderDetail;
use payments_rs::mercadopago::payment::PaymentDetail;
use payments_rs::metrics::Metrics;
use payments_rs::routes::{payments_router, AppState};
use payments_rs::{PaymentGateway, PgPaymentStore, Reconciler};

/// Connect to the test database and run migrations.
/// Uses a small connection pool with short timeouts for tests.
pub async fn setup_pool() -> PgPool {
    dotenvy::dotenv().ok();

    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for integration tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Close the pool and release all connections.
pub async fn teardown_pool(pool: PgPool) {
    pool.close().await;
}

/// Provider stub: canned payment and merchant-order resources keyed by id.
/// Unknown ids answer with the provider's 404; ids registered as failing
/// answer with a 500.
#[derive(Clone, Default)]
pub struct StubGateway {
    payments: HashMap<String, PaymentDetail>,
    merchant_orders: HashMap<String, MerchantOrderDetail>,
    failing: HashSet<String>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payment(mut self, id: &str, status: &str, reference: Option<&str>) -> Self {
        self.payments.insert(
            id.to_string(),
            PaymentDetail {
                id: id.parse().unwrap_or(0),
                status: status.to_string(),
                external_reference: reference.map(str::to_string),
                metadata: None,
                additional_info: None,
                order: None,
            },
        );
        self
    }

    pub fn with_payment_detail(mut self, id: &str, detail: PaymentDetail) -> Self {
        self.payments.insert(id.to_string(), detail);
        self
    }

    pub fn with_merchant_order(mut self, id: &str, status: &str, reference: Option<&str>) -> Self {
        self.merchant_orders.insert(
            id.to_string(),
            MerchantOrderDetail {
                id: id.parse().unwrap_or(0),
                status: status.to_string(),
                external_reference: reference.map(str::to_string),
            },
        );
        self
    }

    pub fn with_failure(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn payment_detail(&self, resource_id: &str) -> Result<PaymentDetail, MercadoPagoError> {
        if self.failing.contains(resource_id) {
            return Err(MercadoPagoError::ApiError {
                status_code: 500,
                message: "internal error".to_string(),
            });
        }
        self.payments.get(resource_id).cloned().ok_or_else(|| {
            MercadoPagoError::ApiError {
                status_code: 404,
                message: "payment not found".to_string(),
            }
        })
    }

    async fn merchant_order_detail(
        &self,
        resource_id: &str,
    ) -> Result<MerchantOrderDetail, MercadoPagoError> {
        if self.failing.contains(resource_id) {
            return Err(MercadoPagoError::ApiError {
                status_code: 500,
                message: "internal error".to_string(),
            });
        }
        self.merchant_orders.get(resource_id).cloned().ok_or_else(|| {
            MercadoPagoError::ApiError {
                status_code: 404,
                message: "merchant order not found".to_string(),
            }
        })
    }
}

/// Build the payments router with the stub gateway and no webhook secret.
pub fn app(pool: &PgPool, gateway: StubGateway) -> Router {
    build_app(pool, gateway, None)
}

/// Build the payments router with signature verification enabled.
pub fn app_with_secret(pool: &PgPool, gateway: StubGateway, secret: &str) -> Router {
    build_app(pool, gateway, Some(secret.to_string()))
}

fn build_app(pool: &PgPool, gateway: StubGateway, secret: Option<String>) -> Router {
    let reconciler = Reconciler::new(
        Arc::new(PgPaymentStore::new(pool.clone())),
        Arc::new(gateway),
    );
    let state = Arc::new(AppState {
        db: pool.clone(),
        reconciler,
        metrics: Metrics::new(),
        webhook_secret: secret,
    });
    payments_router(state)
}

/// Read response body as JSON.
pub async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Generate a unique sale reference.
pub fn unique_sale_reference() -> String {
    format!("sale-{}", Uuid::new_v4())
}

/// Generate a unique external reference.
pub fn unique_external_reference() -> String {
    format!("pay_{}", Uuid::new_v4().simple())
}

/// Create a test payment with known data. Returns the payment id.
pub async fn seed_payment(
    pool: &PgPool,
    method: &str,
    status: &str,
    external_reference: Option<&str>,
    provider_order_id: Option<&str>,
) -> Uuid {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"INSERT INTO payments (
            id, branch_id, sale_reference, method, amount_cents, currency,
            external_reference, provider_order_id, status, created_at, updated_at
        ) VALUES (
            $1, 'suc-centro', $2, $3::payments_method, 150000, 'ARS',
            $4, $5, $6::payments_status, NOW(), NOW()
        )"#,
    )
    .bind(id)
    .bind(unique_sale_reference())
    .bind(method)
    .bind(external_reference)
    .bind(provider_order_id)
    .bind(status)
    .execute(pool)
    .await
    .expect("Failed to seed test payment");

    id
}

/// Fetch the stored status and provider resource id of a payment.
pub async fn payment_state(pool: &PgPool, id: Uuid) -> (String, Option<String>) {
    sqlx::query_as::<_, (String, Option<String>)>(
        "SELECT status::text, provider_resource_id FROM payments WHERE id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .expect("Failed to fetch test payment")
}

/// Create a received-notification log row. Returns the row id.
pub async fn seed_webhook_record(
    pool: &PgPool,
    event_kind: &str,
    resource_id: &str,
    outcome: &str,
) -> i32 {
    sqlx::query_scalar::<_, i32>(
        r#"INSERT INTO payment_webhooks
            (branch_id, event_kind, resource_id, outcome, payload, received_at)
        VALUES ('suc-centro', $1, $2, $3, '{}', NOW())
        RETURNING id"#,
    )
    .bind(event_kind)
    .bind(resource_id)
    .bind(outcome)
    .fetch_one(pool)
    .await
    .expect("Failed to seed webhook record")
}

/// Clean up test payments by ID.
pub async fn cleanup_payments(pool: &PgPool, payment_ids: &[Uuid]) {
    for &payment_id in payment_ids {
        sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(payment_id)
            .execute(pool)
            .await
            .ok();
    }
}

/// Clean up the received-notification log.
pub async fn cleanup_webhook_log(pool: &PgPool) {
    sqlx::query("DELETE FROM payment_webhooks")
        .execute(pool)
        .await
        .ok();
}
