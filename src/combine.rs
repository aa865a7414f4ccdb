//! # Signal combination
//! Pure policies mapping a `SignalSet` to a `Verdict`. No I/O, total over
//! any input (all scores are already clamped to [0,1]).
//!
//! The weighted sum is the default. Threshold gate and keyword switch are
//! alternative rule sets selectable from configuration.

use crate::config::PolicyKind;
use crate::outcome::ValidationStatus;
use crate::signal::{clamp01, SignalFlag, SignalSet};

pub const W_GEOGRAPHY: f64 = 0.30;
pub const W_TEXT: f64 = 0.25;
pub const W_PHOTO: f64 = 0.25;
pub const W_SATELLITE: f64 = 0.20;

pub const AUTO_VALIDATE: f64 = 0.75;
pub const REVIEW: f64 = 0.5;

/// Spam probability at or above which the text signal decides the status.
pub const SPAM_VETO: f64 = 0.7;

pub const FLAG_HIGH_SPAM: &str = "High spam probability detected";
pub const FLAG_UNVERIFIED_LOCATION: &str = "Location not verified as mangrove habitat";
pub const FLAG_PHOTO_QUESTIONABLE: &str = "Photo authenticity questionable";
pub const FLAG_SPAM_SUSPECTED: &str = "Reporter text shows repeated urgency keywords";
pub const FLAG_RATE_ABUSE: &str = "Reporter exceeded daily submission limit";
pub const FLAG_NEAR_DUPLICATE: &str = "Near-duplicate of a recent submission";
pub const FLAG_SPAM_VETO: &str = "Status forced to flagged by spam indicator";
pub const FLAG_HIGH_SEVERITY: &str = "High-severity incident awaiting authority review";

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: ValidationStatus,
    /// Combined confidence in [0,1].
    pub score: f64,
    /// Policy-specific flags, appended after the shared advisories.
    pub flags: Vec<String>,
}

pub trait CombinationPolicy: Send + Sync {
    fn name(&self) -> &'static str;
    fn compute(&self, signals: &SignalSet) -> Verdict;
}

/// Build the configured policy.
pub fn policy_for(kind: PolicyKind, spam_veto: bool) -> Box<dyn CombinationPolicy> {
    match kind {
        PolicyKind::WeightedSum => Box::new(WeightedSum { spam_veto }),
        PolicyKind::ThresholdGate => Box::new(ThresholdGate),
        PolicyKind::KeywordSwitch => Box::new(KeywordSwitch),
    }
}

/// Status from the unrounded composite.
pub fn classify(score: f64) -> ValidationStatus {
    if score >= AUTO_VALIDATE {
        ValidationStatus::AutoValidated
    } else if score >= REVIEW {
        ValidationStatus::PendingReview
    } else {
        ValidationStatus::Flagged
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WeightedSum {
    pub spam_veto: bool,
}

impl Default for WeightedSum {
    fn default() -> Self {
        Self { spam_veto: true }
    }
}

impl WeightedSum {
    pub fn composite(s: &SignalSet) -> f64 {
        clamp01(
            W_GEOGRAPHY * s.geography.score
                + W_TEXT * s.text.score
                + W_PHOTO * s.photo.score
                + W_SATELLITE * s.satellite.score,
        )
    }
}

impl CombinationPolicy for WeightedSum {
    fn name(&self) -> &'static str {
        "weighted_sum"
    }

    fn compute(&self, s: &SignalSet) -> Verdict {
        let score = Self::composite(s);
        let mut status = classify(score);
        let mut flags = Vec::new();
        if self.spam_veto && s.text.spam_probability() >= SPAM_VETO {
            status = ValidationStatus::Flagged;
            flags.push(FLAG_SPAM_VETO.to_string());
        }
        Verdict {
            status,
            score,
            flags,
        }
    }
}

/// Mean of reporter history and photo, with a photo floor for auto-validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdGate;

impl CombinationPolicy for ThresholdGate {
    fn name(&self) -> &'static str {
        "threshold_gate"
    }

    fn compute(&self, s: &SignalSet) -> Verdict {
        let history = s.history.score * 100.0;
        let photo = s.photo.score * 100.0;
        let combined = (history + photo) / 2.0;
        let status = if combined >= 80.0 && photo >= 75.0 {
            ValidationStatus::AutoValidated
        } else if combined < 40.0 {
            ValidationStatus::Flagged
        } else {
            ValidationStatus::PendingReview
        };
        Verdict {
            status,
            score: clamp01(combined / 100.0),
            flags: Vec::new(),
        }
    }
}

/// Spam keyword decides; everything else waits for a human.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordSwitch;

impl CombinationPolicy for KeywordSwitch {
    fn name(&self) -> &'static str {
        "keyword_switch"
    }

    fn compute(&self, s: &SignalSet) -> Verdict {
        let status = if s.text.spam_probability() >= SPAM_VETO {
            ValidationStatus::Flagged
        } else {
            ValidationStatus::PendingReview
        };
        let mut flags = Vec::new();
        if s.severity.is_elevated() {
            flags.push(FLAG_HIGH_SEVERITY.to_string());
        }
        Verdict {
            status,
            score: s.text.score,
            flags,
        }
    }
}

/// Risk advisories shared by every policy, in fixed order.
pub fn advisory_flags(s: &SignalSet) -> Vec<String> {
    let mut out = Vec::new();
    if s.text.spam_probability() > 0.7 {
        out.push(FLAG_HIGH_SPAM);
    }
    if s.geography.score < 0.3 {
        out.push(FLAG_UNVERIFIED_LOCATION);
    }
    if s.photo.score < 0.4 {
        out.push(FLAG_PHOTO_QUESTIONABLE);
    }
    if s.history.has_flag(SignalFlag::SpamSuspected) {
        out.push(FLAG_SPAM_SUSPECTED);
    }
    if s.history.has_flag(SignalFlag::RateAbuse) {
        out.push(FLAG_RATE_ABUSE);
    }
    if s.history.has_flag(SignalFlag::NearDuplicate) {
        out.push(FLAG_NEAR_DUPLICATE);
    }
    out.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;
    use crate::signal::{SignalDetail, SignalResult};

    fn text(score: f64, spam: f64) -> SignalResult {
        SignalResult::new(score, "text").detail(SignalDetail::Text {
            spam_probability: spam,
            sentiment_score: 0.0,
            environmental_keywords: 0.0,
            credibility_score: score,
            classifier_used: false,
        })
    }

    fn set(geo: f64, txt: SignalResult, photo: f64, history: f64, sat: f64) -> SignalSet {
        SignalSet {
            geography: SignalResult::new(geo, "geo"),
            text: txt,
            photo: SignalResult::new(photo, "photo"),
            history: SignalResult::new(history, "history"),
            satellite: SignalResult::new(sat, "sat"),
            severity: Severity::Medium,
            has_coordinates: true,
        }
    }

    #[test]
    fn weighted_boundary_is_inclusive() {
        // 0.3*0.5 + 0.25*0.3 + 0.25*0.7 + 0.2*0.5
        let v = WeightedSum::default().compute(&set(0.5, text(0.3, 0.0), 0.7, 0.75, 0.5));
        assert_eq!(v.score, 0.5);
        assert_eq!(v.status, ValidationStatus::PendingReview);
    }

    #[test]
    fn composite_just_below_threshold_is_not_promoted() {
        // 0.30 + 0.175 + 0.1549 + 0.12 = 0.7499, which rounds to 75.0%
        let v = WeightedSum::default().compute(&set(1.0, text(0.7, 0.0), 0.6196, 0.5, 0.6));
        assert!(v.score < AUTO_VALIDATE);
        assert_eq!(crate::outcome::to_percent(v.score), 75.0);
        assert_eq!(v.status, ValidationStatus::PendingReview);

        assert_eq!(classify(0.4999), ValidationStatus::Flagged);
        assert_eq!(classify(0.75), ValidationStatus::AutoValidated);
    }

    #[test]
    fn weighted_high_scores_auto_validate() {
        let v = WeightedSum::default().compute(&set(1.0, text(0.9, 0.0), 0.7, 1.0, 0.6));
        assert_eq!(v.status, ValidationStatus::AutoValidated);
        assert!(v.flags.is_empty());
    }

    #[test]
    fn spam_veto_overrides_composite() {
        let v = WeightedSum::default().compute(&set(1.0, text(0.6, 1.0), 1.0, 1.0, 1.0));
        assert_eq!(v.status, ValidationStatus::Flagged);
        assert_eq!(v.flags, vec![FLAG_SPAM_VETO.to_string()]);

        let off = WeightedSum { spam_veto: false }.compute(&set(1.0, text(0.6, 1.0), 1.0, 1.0, 1.0));
        assert_eq!(off.status, ValidationStatus::AutoValidated);
    }

    #[test]
    fn threshold_gate_rules() {
        let g = ThresholdGate;
        assert_eq!(
            g.compute(&set(0.0, text(0.0, 0.0), 0.8, 0.9, 0.0)).status,
            ValidationStatus::AutoValidated
        );
        // combined 85 but photo below 75
        assert_eq!(
            g.compute(&set(0.0, text(0.0, 0.0), 0.7, 1.0, 0.0)).status,
            ValidationStatus::PendingReview
        );
        assert_eq!(
            g.compute(&set(0.0, text(0.0, 0.0), 0.2, 0.3, 0.0)).status,
            ValidationStatus::Flagged
        );
    }

    #[test]
    fn keyword_switch_rules() {
        let k = KeywordSwitch;
        let mut s = set(1.0, text(0.8, 0.0), 1.0, 1.0, 1.0);
        assert_eq!(k.compute(&s).status, ValidationStatus::PendingReview);
        assert_eq!(k.compute(&s).score, 0.8);
        s.severity = Severity::Critical;
        assert_eq!(k.compute(&s).flags, vec![FLAG_HIGH_SEVERITY.to_string()]);
        s.text = text(0.2, 1.0);
        assert_eq!(k.compute(&s).status, ValidationStatus::Flagged);
    }

    #[test]
    fn advisory_order_is_fixed() {
        let mut s = set(0.25, text(0.0, 1.0), 0.2, 0.5, 0.5);
        s.history = SignalResult::new(0.5, "h")
            .flag(SignalFlag::NearDuplicate)
            .flag(SignalFlag::RateAbuse);
        assert_eq!(
            advisory_flags(&s),
            vec![
                FLAG_HIGH_SPAM,
                FLAG_UNVERIFIED_LOCATION,
                FLAG_PHOTO_QUESTIONABLE,
                FLAG_RATE_ABUSE,
                FLAG_NEAR_DUPLICATE,
            ]
        );
    }

    #[test]
    fn every_policy_is_total_over_extremes() {
        for kind in [PolicyKind::WeightedSum, PolicyKind::ThresholdGate, PolicyKind::KeywordSwitch] {
            let p = policy_for(kind, true);
            for v in [0.0, 1.0] {
                let verdict = p.compute(&set(v, text(v, v), v, v, v));
                assert!((0.0..=1.0).contains(&verdict.score));
            }
        }
    }
}
