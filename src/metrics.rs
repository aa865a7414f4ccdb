//! Prometheus wiring. The recorder is installed by the binary; without it the
//! `metrics` macros are no-ops, so library code and tests record freely.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::outcome::ValidationStatus;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe();
        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time series descriptions.
pub fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("validation_total", "Validations completed, by status.");
        describe_counter!(
            "validation_rejected_total",
            "Submissions rejected as malformed before scoring."
        );
        describe_counter!(
            "analyzer_fallback_total",
            "Analyzer results that degraded to a fallback score."
        );
        describe_histogram!("validation_duration_ms", "End-to-end validation time in milliseconds.");
    });
}

pub fn record_validation(status: ValidationStatus, duration_ms: f64) {
    counter!("validation_total", "status" => status.as_str()).increment(1);
    histogram!("validation_duration_ms").record(duration_ms);
}

pub fn record_rejected() {
    counter!("validation_rejected_total").increment(1);
}

pub fn record_fallback(signal: &'static str, reason: &'static str) {
    counter!("analyzer_fallback_total", "signal" => signal, "reason" => reason).increment(1);
}
