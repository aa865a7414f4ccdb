//! Input malformation errors.
//!
//! These are raised while reading a request body or turning a raw
//! `ReportSubmission` into an `IncidentReport`. Anything that fails here
//! never reaches the analyzers; signal-level problems are not errors and
//! degrade to documented scores.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unknown incident type `{0}`")]
    UnknownIncidentType(String),

    #[error("unknown severity `{0}`")]
    UnknownSeverity(String),

    #[error("invalid incident date `{0}` (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("{axis} {value} is outside the valid range")]
    InvalidCoordinate { axis: &'static str, value: f64 },

    #[error("photo reference must not be empty")]
    EmptyPhotoReference,

    #[error("unreadable request body: {0}")]
    MalformedBody(String),
}

impl ValidationError {
    /// Stable short code for API consumers and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::UnknownIncidentType(_) => "unknown_incident_type",
            Self::UnknownSeverity(_) => "unknown_severity",
            Self::InvalidDate(_) => "invalid_date",
            Self::InvalidCoordinate { .. } => "invalid_coordinate",
            Self::EmptyPhotoReference => "empty_photo_reference",
            Self::MalformedBody(_) => "malformed_body",
        }
    }
}
