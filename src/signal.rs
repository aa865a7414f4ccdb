//! signal.rs: one analyzer's verdict on one aspect of a report.
//!
//! Every analyzer produces a `SignalResult`: a score in [0,1], a short
//! human-readable analysis, structured flags, and a typed detail payload with
//! the sub-scores that produced it. Results are created fresh per validation.

use serde::{Deserialize, Serialize};

use crate::report::Severity;

/// Which analyzer produced a signal. Serialized names are the keys of
/// `ValidationResult::ai_analysis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Geography,
    TextAnalysis,
    PhotoAnalysis,
    ReporterHistory,
    Satellite,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geography => "geography",
            Self::TextAnalysis => "text_analysis",
            Self::PhotoAnalysis => "photo_analysis",
            Self::ReporterHistory => "reporter_history",
            Self::Satellite => "satellite",
        }
    }
}

/// Structured flags attached to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalFlag {
    NoCoordinates,
    OutsideKnownZone,
    ProviderUnavailable,
    ProviderError,
    TimedOut,
    ClassifierUnavailable,
    SpamKeywordMatched,
    NoPhoto,
    PhotoMissing,
    PhotoInvalid,
    NoMetadata,
    AnalysisFailed,
    TrustedReporter,
    FirstTimeReporter,
    SpamSuspected,
    InvalidIncidentType,
    RateAbuse,
    NearDuplicate,
}

/// Typed sub-scores per signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalDetail {
    Geography {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        zone: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        nearby_features: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        indicator_features: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elevation_m: Option<f64>,
    },
    Text {
        spam_probability: f64,
        sentiment_score: f64,
        environmental_keywords: f64,
        credibility_score: f64,
        classifier_used: bool,
    },
    Photo {
        technical_quality: f64,
        environmental_content: f64,
        metadata_score: f64,
        authenticity_score: f64,
        has_exif: bool,
        has_gps: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        captured_at: Option<String>,
    },
    History {
        /// Score on the 0–100 scale before normalization.
        raw_score: f64,
        urgency_matches: usize,
    },
    Satellite {
        change_detected: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vegetation_index: Option<f64>,
    },
    /// Short-circuit results (missing input, degraded backend) carry no sub-scores.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    /// Normalized score in [0,1].
    pub score: f64,
    pub analysis: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<SignalFlag>,
    pub detail: SignalDetail,
}

impl SignalResult {
    pub fn new(score: f64, analysis: impl Into<String>) -> Self {
        Self {
            score: clamp01(score),
            analysis: analysis.into(),
            flags: Vec::new(),
            detail: SignalDetail::None,
        }
    }

    pub fn flag(mut self, flag: SignalFlag) -> Self {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    pub fn detail(mut self, detail: SignalDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn has_flag(&self, flag: SignalFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Spam probability if this is a text signal with sub-scores, else 0.
    pub fn spam_probability(&self) -> f64 {
        match self.detail {
            SignalDetail::Text {
                spam_probability, ..
            } => spam_probability,
            _ => 0.0,
        }
    }
}

/// Everything a combination policy may look at. Built once per validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet {
    pub geography: SignalResult,
    pub text: SignalResult,
    pub photo: SignalResult,
    pub history: SignalResult,
    pub satellite: SignalResult,
    pub severity: Severity,
    pub has_coordinates: bool,
}

impl SignalSet {
    pub fn iter(&self) -> impl Iterator<Item = (SignalKind, &SignalResult)> {
        [
            (SignalKind::Geography, &self.geography),
            (SignalKind::TextAnalysis, &self.text),
            (SignalKind::PhotoAnalysis, &self.photo),
            (SignalKind::ReporterHistory, &self.history),
            (SignalKind::Satellite, &self.satellite),
        ]
        .into_iter()
    }
}

pub(crate) fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
