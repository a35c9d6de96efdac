pub mod config;
pub mod db;
pub mod health;
pub mod mercadopago;
pub mod metrics;
pub mod models;
pub mod notification;
pub mod reconciler;
pub mod routes;
pub mod store;

pub use notification::{classify, Classification, IpnQuery, NotificationEnvelope, ResourceKind};
pub use reconciler::{translate_status, PaymentGateway, Reconciler, Reconciliation};
pub use store::{ApplyOutcome, CorrelationKey, PaymentStore, PgPaymentStore};
