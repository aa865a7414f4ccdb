//! Text signal under a classifier that never answers in time.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use mangrove_validator::analyze::classifier::TextClassifier;
use mangrove_validator::signal::{SignalDetail, SignalFlag, SignalKind};
use mangrove_validator::{DecisionEngine, IncidentReport, IncidentType, ReporterSnapshot, ValidatorConfig};

struct Stalled;

#[async_trait]
impl TextClassifier for Stalled {
    fn is_available(&self) -> bool {
        true
    }
    async fn toxicity(&self, _text: &str) -> Result<f64> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(0.0)
    }
    fn name(&self) -> &'static str {
        "stalled"
    }
}

fn engine() -> DecisionEngine {
    let mut cfg = ValidatorConfig::default();
    cfg.analyzer_timeout_ms = 200;
    DecisionEngine::from_config(cfg).with_classifier(Arc::new(Stalled))
}

#[tokio::test]
async fn stalled_classifier_falls_back_to_keywords() {
    let report = IncidentReport::new(
        "Dumping",
        "this is a dummy entry about rubbish by the creek",
        IncidentType::Dumping,
    );
    let out = engine().validate(&report, &ReporterSnapshot::new(2, 0)).await;
    let text = &out.ai_analysis[&SignalKind::TextAnalysis];

    assert!(text.has_flag(SignalFlag::TimedOut));
    assert!(text.has_flag(SignalFlag::ClassifierUnavailable));
    assert!(text.has_flag(SignalFlag::SpamKeywordMatched));
    match &text.detail {
        SignalDetail::Text {
            spam_probability,
            classifier_used,
            ..
        } => {
            assert_eq!(*spam_probability, 1.0);
            assert!(!classifier_used);
        }
        other => panic!("unexpected detail {other:?}"),
    }
}

#[tokio::test]
async fn timed_out_text_still_scores_the_description() {
    let report = IncidentReport::new(
        "Clearing",
        "Long stretch of mangrove belt by the creek cleared for new shrimp ponds",
        IncidentType::IllegalCutting,
    );
    let out = engine().validate(&report, &ReporterSnapshot::new(2, 0)).await;
    let text = &out.ai_analysis[&SignalKind::TextAnalysis];
    assert!(text.has_flag(SignalFlag::TimedOut));
    // 0.5 base + 0.1 for a description over 50 characters
    assert!((text.score - 0.6).abs() < 1e-9, "got {}", text.score);
}
