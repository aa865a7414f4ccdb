//! Mangrove report validator: binary entrypoint.
//! Loads configuration, builds the decision engine and serves the HTTP API.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::info;

use mangrove_validator::metrics::Metrics;
use mangrove_validator::telemetry::enable_dev_tracing;
use mangrove_validator::{router, AppState, DecisionEngine, ValidatorConfig};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // .env is optional; it supplies API keys and overrides in local runs.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let config = ValidatorConfig::load().context("loading validator config")?;
    info!(
        target: "validator",
        policy = ?config.policy,
        gate = ?config.geography_gate,
        geo_mode = ?config.geography.mode,
        zones = config.geography.zones.len(),
        "validator config loaded"
    );

    let metrics = Metrics::init()?;
    let engine = DecisionEngine::from_config(config);
    let app = router(AppState::new(engine)).merge(metrics.router());

    Ok(app.into())
}
