// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod combine;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod report;
pub mod signal;
pub mod telemetry;

pub use crate::api::{router, AppState};
pub use crate::config::ValidatorConfig;
pub use crate::engine::DecisionEngine;
pub use crate::error::ValidationError;
pub use crate::outcome::{ReportOutcome, ValidationResult, ValidationStatus};
pub use crate::report::{IncidentReport, IncidentType, ReportSubmission, ReporterSnapshot, Severity};
