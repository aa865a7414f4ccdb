//! Reporter-history signal: submitter trust, urgency spam and rate abuse.
//!
//! Scored on a 0–100 scale with fixed adjustments, then normalized.

use super::text::description_chars;
use crate::report::{IncidentType, ReporterSnapshot};
use crate::signal::{SignalDetail, SignalFlag, SignalResult};

const BASE: f64 = 100.0;

pub const URGENCY_KEYWORDS: [&str; 8] = [
    "urgent",
    "emergency",
    "immediately",
    "asap",
    "hurry",
    "help",
    "alert",
    "now",
];

/// Normalized Levenshtein similarity at or above which a description counts as a repeat.
pub const NEAR_DUPLICATE_SIMILARITY: f64 = 0.9;

#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryAnalyzer;

impl HistoryAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// `incident_type` is the raw string; values outside the known set cost 20 points.
    pub fn analyze(
        &self,
        title: &str,
        description: &str,
        incident_type: &str,
        reporter: &ReporterSnapshot,
    ) -> SignalResult {
        let mut raw = BASE;
        let mut flags = Vec::new();

        if reporter.report_count > 10 {
            raw += 20.0;
            flags.push(SignalFlag::TrustedReporter);
        } else if reporter.report_count == 0 {
            raw -= 10.0;
            flags.push(SignalFlag::FirstTimeReporter);
        }

        let combined = format!("{title} {description}").to_lowercase();
        let urgency = count_urgency(&combined);
        if urgency > 2 {
            raw -= 30.0;
            flags.push(SignalFlag::SpamSuspected);
        }

        let len = description_chars(description);
        if len < 20 {
            raw -= 15.0;
        } else if len > 500 {
            raw += 10.0;
        }

        if incident_type.parse::<IncidentType>().is_err() {
            raw -= 20.0;
            flags.push(SignalFlag::InvalidIncidentType);
        }

        if reporter.reports_last_24h > 5 {
            raw -= 25.0;
            flags.push(SignalFlag::RateAbuse);
        }

        if is_near_duplicate(description, &reporter.recent_descriptions) {
            flags.push(SignalFlag::NearDuplicate);
        }

        let raw = raw.clamp(0.0, 100.0);
        let mut sig = SignalResult::new(
            raw / 100.0,
            format!(
                "Reporter history: {raw:.0}/100 ({} prior reports, {} in last 24h)",
                reporter.report_count, reporter.reports_last_24h
            ),
        )
        .detail(SignalDetail::History {
            raw_score: raw,
            urgency_matches: urgency,
        });
        for f in flags {
            sig = sig.flag(f);
        }
        sig
    }
}

/// Whole-word occurrences of urgency keywords (repeats count).
fn count_urgency(lower: &str) -> usize {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| URGENCY_KEYWORDS.contains(w))
        .count()
}

fn is_near_duplicate(description: &str, recent: &[String]) -> bool {
    let d = description.trim().to_lowercase();
    if d.is_empty() {
        return false;
    }
    recent.iter().any(|prev| {
        let p = prev.trim().to_lowercase();
        !p.is_empty() && strsim::normalized_levenshtein(&d, &p) >= NEAR_DUPLICATE_SIMILARITY
    })
}
