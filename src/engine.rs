//! # Decision Engine
//! Runs every analyzer on one report, combines the signals with the
//! configured policy, applies the geography gate and assembles the
//! `ValidationResult`.
//!
//! Geography, text and photo may suspend on I/O and run concurrently, each
//! under the configured timeout. History and satellite are synchronous.
//! The engine holds no per-report state and is shared behind `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::analyze::classifier::{build_classifier, TextClassifier};
use crate::analyze::geography::{build_geo_provider, GeoDataProvider, GeographyAnalyzer, Zone};
use crate::analyze::history::HistoryAnalyzer;
use crate::analyze::photo::{PhotoAnalyzer, PhotoStore};
use crate::analyze::satellite::SatelliteProxy;
use crate::analyze::text::TextAnalyzer;
use crate::combine::{advisory_flags, policy_for, CombinationPolicy};
use crate::config::{GeographyGate, ValidatorConfig};
use crate::error::ValidationError;
use crate::metrics;
use crate::outcome::{to_percent, ValidationResult, ValidationStatus};
use crate::report::{IncidentReport, ReportSubmission, ReporterSnapshot};
use crate::signal::{SignalFlag, SignalKind, SignalResult, SignalSet};
use crate::telemetry::anon_hash;

pub const FLAG_OUTSIDE_ZONE: &str = "Location outside known mangrove zones";

pub struct DecisionEngine {
    config: ValidatorConfig,
    geography: GeographyAnalyzer,
    text: TextAnalyzer,
    photo: PhotoAnalyzer,
    history: HistoryAnalyzer,
    satellite: SatelliteProxy,
    policy: Box<dyn CombinationPolicy>,
}

impl DecisionEngine {
    /// Engine with the backends the config (and its resolved API keys) select.
    pub fn from_config(config: ValidatorConfig) -> Self {
        metrics::describe();
        let geo_provider = build_geo_provider(config.geo_api_key());
        let classifier = build_classifier(&config.text, config.text_api_key());
        Self {
            geography: GeographyAnalyzer::from_config(&config.geography, geo_provider),
            text: TextAnalyzer::new(classifier),
            photo: PhotoAnalyzer::from_config(&config.photo),
            history: HistoryAnalyzer::new(),
            satellite: SatelliteProxy::from_config(&config.satellite),
            policy: policy_for(config.policy, config.spam_veto),
            config,
        }
    }

    pub fn with_geo_provider(mut self, provider: Arc<dyn GeoDataProvider>) -> Self {
        self.geography = GeographyAnalyzer::from_config(&self.config.geography, provider);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn TextClassifier>) -> Self {
        self.text = TextAnalyzer::new(classifier);
        self
    }

    pub fn with_photo_store(mut self, store: Arc<dyn PhotoStore>) -> Self {
        self.photo = PhotoAnalyzer::new(store, self.config.photo.max_dimension)
            .with_decode_limit(self.config.photo.max_decode_dimension);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn zones(&self) -> &[Zone] {
        self.geography.zones()
    }

    fn analyzer_timeout(&self) -> Duration {
        self.config.analyzer_timeout()
    }

    /// Check a raw submission, then validate it.
    pub async fn validate_submission(
        &self,
        submission: ReportSubmission,
    ) -> Result<ValidationResult, ValidationError> {
        match submission.into_parts() {
            Ok((report, reporter)) => Ok(self.validate(&report, &reporter).await),
            Err(e) => {
                metrics::record_rejected();
                debug!(target: "validator", code = e.code(), "submission rejected");
                Err(e)
            }
        }
    }

    pub async fn validate(
        &self,
        report: &IncidentReport,
        reporter: &ReporterSnapshot,
    ) -> ValidationResult {
        let started = Instant::now();
        let id = anon_hash(&report.combined_text());
        let limit = self.analyzer_timeout();

        let (geo, text, photo) = tokio::join!(
            timeout(limit, self.geography.analyze(report.latitude, report.longitude)),
            timeout(limit, self.text.analyze(&report.title, &report.description)),
            timeout(limit, self.photo.analyze(report.photo.as_ref())),
        );

        let geography = geo.unwrap_or_else(|_| {
            warn!(target: "validator", report = %id, signal = "geography", "analyzer timed out");
            GeographyAnalyzer::timed_out()
        });
        let text = text.unwrap_or_else(|_| {
            warn!(target: "validator", report = %id, signal = "text_analysis", "analyzer timed out");
            self.text
                .rule_based(&report.title, &report.description)
                .flag(SignalFlag::TimedOut)
        });
        let photo = photo.unwrap_or_else(|_| {
            warn!(target: "validator", report = %id, signal = "photo_analysis", "analyzer timed out");
            PhotoAnalyzer::timed_out()
        });

        let has_coordinates = report.coordinates().is_some();
        let set = SignalSet {
            geography,
            text,
            photo,
            history: self.history.analyze(
                &report.title,
                &report.description,
                report.incident_type.as_str(),
                reporter,
            ),
            satellite: self.satellite.analyze(has_coordinates),
            severity: report.severity,
            has_coordinates,
        };
        record_fallbacks(&set);

        let result = self.decide(set);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        metrics::record_validation(result.validation_status, elapsed_ms);
        info!(
            target: "validator",
            report = %id,
            status = result.validation_status.as_str(),
            confidence = result.confidence_score,
            policy = %result.policy,
            flags = result.risk_flags.len(),
            elapsed_ms = elapsed_ms as u64,
            "report validated"
        );
        result
    }

    /// Pure part: policy, advisories, gate, result assembly.
    pub fn decide(&self, set: SignalSet) -> ValidationResult {
        let verdict = self.policy.compute(&set);
        let mut status = verdict.status;
        let mut risk_flags = advisory_flags(&set);
        risk_flags.extend(verdict.flags);

        if self.gate_trips(&set) {
            status = ValidationStatus::Flagged;
            risk_flags.push(FLAG_OUTSIDE_ZONE.to_string());
        }

        let ai_analysis: BTreeMap<SignalKind, SignalResult> =
            set.iter().map(|(k, s)| (k, s.clone())).collect();

        ValidationResult {
            confidence_score: to_percent(verdict.score),
            validation_status: status,
            policy: self.policy.name().to_string(),
            ai_analysis,
            risk_flags,
            recommendations: status
                .recommendations()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            processing_timestamp: Utc::now(),
        }
    }

    /// Hard gate only: geolocated report positively outside every known zone.
    fn gate_trips(&self, set: &SignalSet) -> bool {
        self.config.geography_gate == GeographyGate::HardGate
            && set.has_coordinates
            && set.geography.has_flag(SignalFlag::OutsideKnownZone)
    }
}

fn record_fallbacks(set: &SignalSet) {
    const REASONS: [(SignalFlag, &str); 7] = [
        (SignalFlag::TimedOut, "timeout"),
        (SignalFlag::ProviderUnavailable, "unavailable"),
        (SignalFlag::ProviderError, "error"),
        (SignalFlag::ClassifierUnavailable, "keyword_fallback"),
        (SignalFlag::PhotoMissing, "missing"),
        (SignalFlag::PhotoInvalid, "invalid"),
        (SignalFlag::AnalysisFailed, "failed"),
    ];
    for (kind, sig) in set.iter() {
        for (flag, reason) in REASONS {
            if sig.has_flag(flag) {
                metrics::record_fallback(kind.as_str(), reason);
            }
        }
    }
}
