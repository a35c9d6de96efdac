use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Prometheus registry plus the counters this service exports.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    /// Inbound notifications by kind and outcome
    /// (outcome: applied|already_terminal|not_found|ignored|error).
    pub notifications_total: IntCounterVec,

    /// Manual confirmations by result (confirmed|conflict|rejected).
    pub manual_confirmations_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let notifications_total = IntCounterVec::new(
            Opts::new(
                "payments_notifications_total",
                "Provider notifications received",
            ),
            &["kind", "outcome"],
        )
        .expect("metric");

        let manual_confirmations_total = IntCounterVec::new(
            Opts::new(
                "payments_manual_confirmations_total",
                "Manual payment confirmations",
            ),
            &["result"],
        )
        .expect("metric");

        registry
            .register(Box::new(notifications_total.clone()))
            .unwrap();
        registry
            .register(Box::new(manual_confirmations_total.clone()))
            .unwrap();

        Self {
            registry,
            notifications_total,
            manual_confirmations_total,
        }
    }

    pub fn render(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&mf, &mut buf).map_err(|e| e.to_string())?;
        String::from_utf8(buf).map_err(|e| e.to_string())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
