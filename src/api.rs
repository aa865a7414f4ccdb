use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::analyze::geography::Zone;
use crate::engine::DecisionEngine;
use crate::error::ValidationError;
use crate::metrics;
use crate::outcome::{ReportOutcome, ValidationResult};
use crate::report::ReportSubmission;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DecisionEngine>,
}

impl AppState {
    pub fn new(engine: DecisionEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/validate", post(validate))
        .route("/validate/outcome", post(validate_outcome))
        .route("/zones", get(zones))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

/// Malformed submissions answer 422 with a plain message and a stable code.
pub struct ApiError(pub ValidationError);

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        metrics::record_rejected();
        Self(ValidationError::MalformedBody(r.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.code(),
        };
        (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
    }
}

async fn validate(
    State(state): State<AppState>,
    body: Result<Json<ReportSubmission>, JsonRejection>,
) -> Result<Json<ValidationResult>, ApiError> {
    let Json(body) = body?;
    let result = state.engine.validate_submission(body).await?;
    Ok(Json(result))
}

async fn validate_outcome(
    State(state): State<AppState>,
    body: Result<Json<ReportSubmission>, JsonRejection>,
) -> Result<Json<ReportOutcome>, ApiError> {
    let Json(body) = body?;
    let result = state.engine.validate_submission(body).await?;
    Ok(Json(result.outcome()))
}

#[derive(Serialize)]
struct ZonesResp<'a> {
    mode: crate::config::GeoMode,
    zones: &'a [Zone],
}

async fn zones(State(state): State<AppState>) -> Response {
    let body = ZonesResp {
        mode: state.engine.config().geography.mode,
        zones: state.engine.zones(),
    };
    Json(body).into_response()
}
