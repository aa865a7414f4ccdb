//! outcome.rs: the engine's output and its persisted flattening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::signal::{SignalKind, SignalResult};

/// Final status of a validated report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    AutoValidated,
    PendingReview,
    Flagged,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoValidated => "auto_validated",
            Self::PendingReview => "pending_review",
            Self::Flagged => "flagged",
        }
    }

    /// Fixed, status-keyed guidance shown to reviewers.
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            Self::AutoValidated => &[
                "Report appears highly credible",
                "Auto-approved for publication",
            ],
            Self::PendingReview => &[
                "Moderate confidence",
                "Requires manual review by authority",
            ],
            Self::Flagged => &[
                "Low confidence score",
                "Flagged for detailed investigation",
            ],
        }
    }

    /// One-line reason shown to the submitter.
    pub fn plain_reason(&self) -> &'static str {
        match self {
            Self::AutoValidated => "Your report was verified automatically and is now published.",
            Self::PendingReview => "Your report is awaiting review by a local authority.",
            Self::Flagged => "Your report needs further investigation before it can be published.",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete, transient result of one validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// 0–100, rounded to one decimal.
    pub confidence_score: f64,
    pub validation_status: ValidationStatus,
    /// Name of the combination policy that produced the status.
    pub policy: String,
    pub ai_analysis: BTreeMap<SignalKind, SignalResult>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub processing_timestamp: DateTime<Utc>,
}

/// What the submission workflow writes onto the report record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub status: ValidationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    pub validation_notes: String,
    pub reason: String,
}

impl ValidationResult {
    /// Flatten into the persisted fields: risk flags first, then one
    /// `name: analysis` line per signal.
    pub fn outcome(&self) -> ReportOutcome {
        let mut lines = Vec::with_capacity(self.risk_flags.len() + self.ai_analysis.len());
        for f in &self.risk_flags {
            lines.push(format!("FLAG: {f}"));
        }
        for (kind, sig) in &self.ai_analysis {
            lines.push(format!(
                "{} ({:.2}): {}",
                kind.as_str(),
                sig.score,
                sig.analysis
            ));
        }

        ReportOutcome {
            status: self.validation_status,
            confidence_score: Some(self.confidence_score),
            validation_notes: lines.join("\n"),
            reason: self.validation_status.plain_reason().to_string(),
        }
    }
}

/// Scale a [0,1] score to percent and round to one decimal.
pub fn to_percent(score: f64) -> f64 {
    round1(score.clamp(0.0, 1.0) * 100.0)
}

/// Round to one decimal place.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalFlag;

    fn sample() -> ValidationResult {
        let mut ai = BTreeMap::new();
        ai.insert(
            SignalKind::Geography,
            SignalResult::new(0.25, "outside known mangrove zones")
                .flag(SignalFlag::OutsideKnownZone),
        );
        ai.insert(SignalKind::PhotoAnalysis, SignalResult::new(0.7, "no photo provided"));
        ValidationResult {
            confidence_score: 48.3,
            validation_status: ValidationStatus::Flagged,
            policy: "weighted_sum".into(),
            ai_analysis: ai,
            risk_flags: vec!["Location not verified as mangrove habitat".into()],
            recommendations: ValidationStatus::Flagged
                .recommendations()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            processing_timestamp: Utc::now(),
        }
    }

    #[test]
    fn percent_rounding() {
        assert_eq!(to_percent(0.8234), 82.3);
        assert_eq!(to_percent(0.49999999999), 50.0);
        assert_eq!(to_percent(1.5), 100.0);
        assert_eq!(to_percent(-0.2), 0.0);
    }

    #[test]
    fn status_serializes_snake_case() {
        let v = serde_json::to_value(ValidationStatus::PendingReview).unwrap();
        assert_eq!(v, serde_json::json!("pending_review"));
    }

    #[test]
    fn outcome_lists_flags_before_signals() {
        let o = sample().outcome();
        assert_eq!(o.status, ValidationStatus::Flagged);
        assert_eq!(o.confidence_score, Some(48.3));
        let lines: Vec<&str> = o.validation_notes.lines().collect();
        assert_eq!(lines[0], "FLAG: Location not verified as mangrove habitat");
        assert!(lines[1].starts_with("geography (0.25)"));
        assert!(lines[2].starts_with("photo_analysis (0.70)"));
    }

    #[test]
    fn ai_analysis_keys_are_signal_names() {
        let v = serde_json::to_value(sample()).unwrap();
        assert!(v["ai_analysis"].get("geography").is_some());
        assert!(v["ai_analysis"].get("photo_analysis").is_some());
    }
}
