//! # Prometheus Metrics
//!
//! Operational metrics for the bank node, scraped at `/metrics` on the
//! metrics port. Everything lives in a dedicated registry prefixed
//! `vaultbank`, so nothing collides with the default global registry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use vaultbank_contracts::BankView;

/// Metric handles for the node. Handles are internally reference counted,
/// so clones observe the same series.
#[derive(Clone)]
pub struct BankMetrics {
    registry: Registry,
    /// Entry point calls by operation and outcome (`ok` or the error kind).
    pub operations_total: IntCounterVec,
    /// 1 while the bank is paused.
    pub bank_paused: IntGauge,
    /// Active logic revision number.
    pub logic_version: IntGauge,
    /// Time spent inside an entry point, lock wait included.
    pub operation_latency_seconds: HistogramVec,
}

impl BankMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("vaultbank".into()), None)?;

        let operations_total = IntCounterVec::new(
            Opts::new("operations_total", "Bank entry point calls by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let bank_paused = IntGauge::new("bank_paused", "1 while the bank is paused")?;
        registry.register(Box::new(bank_paused.clone()))?;

        let logic_version = IntGauge::new("logic_version", "Active logic revision")?;
        registry.register(Box::new(logic_version.clone()))?;

        let operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Entry point latency in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            bank_paused,
            logic_version,
            operation_latency_seconds,
        })
    }

    /// Records one finished entry point call.
    pub fn observe(&self, operation: &str, outcome: &str, elapsed: Duration) {
        self.operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.operation_latency_seconds
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }

    /// Refreshes the gauges from committed bank state.
    pub fn record_state(&self, view: &BankView<'_>) {
        match view.is_paused() {
            Ok(paused) => self.bank_paused.set(i64::from(paused)),
            Err(e) => tracing::debug!(error = %e, "pause flag unavailable for metrics"),
        }
        match view.logic_version() {
            Ok(version) => self.logic_version.set(i64::from(version.as_u32())),
            Err(e) => tracing::debug!(error = %e, "logic version unavailable for metrics"),
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<BankMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
