//! report.rs: incident reports as the engine sees them.
//!
//! `ReportSubmission` is the raw input contract coming from the submission
//! workflow (strings straight from a form or JSON body). `IncidentReport`
//! is the checked form the analyzers consume; the conversion is the only
//! place input malformation is detected.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Kind of habitat incident being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    IllegalCutting,
    Pollution,
    Construction,
    Dumping,
    Erosion,
}

impl IncidentType {
    pub const ALL: [IncidentType; 5] = [
        IncidentType::IllegalCutting,
        IncidentType::Pollution,
        IncidentType::Construction,
        IncidentType::Dumping,
        IncidentType::Erosion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IllegalCutting => "illegal_cutting",
            Self::Pollution => "pollution",
            Self::Construction => "construction",
            Self::Dumping => "dumping",
            Self::Erosion => "erosion",
        }
    }
}

impl FromStr for IncidentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == norm)
            .ok_or_else(|| ValidationError::UnknownIncidentType(s.trim().to_string()))
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporter-assessed severity. Defaults to `Medium` when the form omits it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ValidationError::UnknownSeverity(s.trim().to_string())),
        }
    }
}

/// Opaque handle into the photo store (e.g. an upload filename).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRef(String);

impl PhotoRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Aggregate counters for the submitter, supplied by the persistence layer.
/// The engine only reads these; it never looks up "the current user".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReporterSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter_id: Option<String>,
    /// Reports submitted before this one.
    pub report_count: u32,
    /// Reports submitted in the trailing 24 hours.
    pub reports_last_24h: u32,
    /// Latest descriptions by the same reporter (most recent first), if the caller has them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_descriptions: Vec<String>,
}

impl ReporterSnapshot {
    pub fn new(report_count: u32, reports_last_24h: u32) -> Self {
        Self {
            reporter_id: None,
            report_count,
            reports_last_24h,
            recent_descriptions: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.reporter_id = Some(id.into());
        self
    }

    pub fn with_recent(mut self, descriptions: Vec<String>) -> Self {
        self.recent_descriptions = descriptions;
        self
    }
}

/// A checked incident report, ready for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    pub title: String,
    pub description: String,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo: Option<PhotoRef>,
    pub incident_date: Option<NaiveDate>,
    pub submitted_at: DateTime<Utc>,
}

impl IncidentReport {
    /// Minimal constructor; optional parts are added with the builder methods.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        incident_type: IncidentType,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            incident_type,
            severity: Severity::default(),
            latitude: None,
            longitude: None,
            photo: None,
            incident_date: None,
            submitted_at: Utc::now(),
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_photo(mut self, handle: impl Into<String>) -> Self {
        self.photo = Some(PhotoRef::new(handle));
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Both coordinates, or nothing.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Title and description joined with a single space.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Raw input contract from the report-submission workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSubmission {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub incident_type: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub photo_reference: Option<String>,
    /// Calendar date of the incident, `YYYY-MM-DD`.
    #[serde(default)]
    pub incident_date: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submitter_id: Option<String>,
    #[serde(default)]
    pub submitter_report_count: u32,
    #[serde(default)]
    pub submitter_24h_count: u32,
    #[serde(default)]
    pub submitter_recent_descriptions: Vec<String>,
}

impl ReportSubmission {
    /// Check the submission and split it into the report and the reporter snapshot.
    pub fn into_parts(self) -> Result<(IncidentReport, ReporterSnapshot), ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        if self.incident_type.trim().is_empty() {
            return Err(ValidationError::MissingField("incident_type"));
        }
        let incident_type: IncidentType = self.incident_type.parse()?;

        let severity = match self.severity.as_deref().map(str::trim) {
            None | Some("") => Severity::default(),
            Some(s) => s.parse()?,
        };

        let latitude = check_axis("latitude", self.latitude, 90.0)?;
        let longitude = check_axis("longitude", self.longitude, 180.0)?;

        let photo = match self.photo_reference {
            None => None,
            Some(p) if p.trim().is_empty() => return Err(ValidationError::EmptyPhotoReference),
            Some(p) => Some(PhotoRef::new(p.trim())),
        };

        let incident_date = match self.incident_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(d) => Some(
                NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|_| ValidationError::InvalidDate(d.to_string()))?,
            ),
        };

        let report = IncidentReport {
            title: title.to_string(),
            description: self.description,
            incident_type,
            severity,
            latitude,
            longitude,
            photo,
            incident_date,
            submitted_at: self.submitted_at.unwrap_or_else(Utc::now),
        };

        let reporter = ReporterSnapshot {
            reporter_id: self.submitter_id,
            report_count: self.submitter_report_count,
            reports_last_24h: self.submitter_24h_count,
            recent_descriptions: self.submitter_recent_descriptions,
        };

        Ok((report, reporter))
    }
}

fn check_axis(
    axis: &'static str,
    value: Option<f64>,
    limit: f64,
) -> Result<Option<f64>, ValidationError> {
    match value {
        Some(v) if !v.is_finite() || v.abs() > limit => {
            Err(ValidationError::InvalidCoordinate { axis, value: v })
        }
        other => Ok(other),
    }
}
