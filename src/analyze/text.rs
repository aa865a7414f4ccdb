//! Text signal: spam likelihood, sentiment, environmental vocabulary and the
//! credibility score derived from them.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

use super::classifier::TextClassifier;
use super::sentiment::SentimentScorer;
use crate::signal::{SignalDetail, SignalFlag, SignalResult};

/// Words that mark a report as a probable test or hoax when no classifier runs.
pub const SPAM_KEYWORDS: [&str; 5] = ["fake", "false", "spam", "test", "dummy"];

pub const ENVIRONMENTAL_TERMS: [&str; 8] = [
    "mangrove",
    "deforestation",
    "illegal cutting",
    "pollution",
    "ecosystem",
    "biodiversity",
    "coastal erosion",
    "habitat loss",
];

static RE_SPAM: Lazy<Regex> = Lazy::new(|| {
    let alt = SPAM_KEYWORDS.join("|");
    Regex::new(&format!(r"(?i)\b(?:{alt})\b")).expect("valid spam regex")
});

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("valid tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Decode HTML entities, drop tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let no_tags = RE_TAGS.replace_all(&decoded, " ");
    RE_WS.replace_all(&no_tags, " ").trim().to_string()
}

/// Length of a description as the length rules see it: characters after
/// normalization, so markup and padding do not count.
pub fn description_chars(raw: &str) -> usize {
    normalize_text(raw).chars().count()
}

/// 1.0 if any spam keyword occurs as a whole word, else 0.0.
pub fn keyword_spam_probability(text: &str) -> f64 {
    if RE_SPAM.is_match(text) {
        1.0
    } else {
        0.0
    }
}

/// Fraction of `ENVIRONMENTAL_TERMS` present in `text`.
pub fn environmental_density(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let found = ENVIRONMENTAL_TERMS
        .iter()
        .filter(|t| lower.contains(*t))
        .count();
    found as f64 / ENVIRONMENTAL_TERMS.len() as f64
}

/// Rule-based credibility. Every rule applies independently; result is clamped.
pub fn credibility(spam: f64, sentiment: f64, density: f64, description_chars: usize) -> f64 {
    let mut c: f64 = 0.5;
    if density > 0.3 {
        c += 0.2;
    }
    if description_chars > 50 {
        c += 0.1;
    }
    if sentiment < -0.1 {
        c += 0.1;
    }
    if spam > 0.5 {
        c -= 0.3;
    }
    if description_chars < 20 {
        c -= 0.2;
    }
    c.clamp(0.0, 1.0)
}

pub struct TextAnalyzer {
    classifier: Arc<dyn TextClassifier>,
    sentiment: SentimentScorer,
}

impl TextAnalyzer {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        Self {
            classifier,
            sentiment: SentimentScorer::new(),
        }
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    pub async fn analyze(&self, title: &str, description: &str) -> SignalResult {
        let title = normalize_text(title);
        let description = normalize_text(description);
        let combined = format!("{title} {description}");

        if !self.classifier.is_available() {
            return self.score(&combined, &description, None);
        }
        match self.classifier.toxicity(&combined).await {
            Ok(p) => self.score(&combined, &description, Some(p)),
            Err(e) => {
                warn!(target: "validator", signal = "text_analysis", classifier = self.classifier.name(), error = %e, "classifier failed, using keyword fallback");
                self.score(&combined, &description, None)
            }
        }
    }

    /// Keyword-only scoring; also used when the analyzer runs out of time.
    pub fn rule_based(&self, title: &str, description: &str) -> SignalResult {
        let title = normalize_text(title);
        let description = normalize_text(description);
        self.score(&format!("{title} {description}"), &description, None)
    }

    fn score(&self, combined: &str, description: &str, classified: Option<f64>) -> SignalResult {
        let keyword_spam = keyword_spam_probability(combined);
        let spam = classified.unwrap_or(keyword_spam).clamp(0.0, 1.0);
        let sentiment = self.sentiment.polarity(combined);
        let density = environmental_density(combined);
        let cred = credibility(spam, sentiment, density, description_chars(description));

        let mut sig = SignalResult::new(
            cred,
            format!("Spam: {spam:.2}, Sentiment: {sentiment:.2}, Keywords: {density:.2}"),
        )
        .detail(SignalDetail::Text {
            spam_probability: spam,
            sentiment_score: sentiment,
            environmental_keywords: density,
            credibility_score: cred,
            classifier_used: classified.is_some(),
        });
        if classified.is_none() {
            sig = sig.flag(SignalFlag::ClassifierUnavailable);
            if keyword_spam > 0.0 {
                sig = sig.flag(SignalFlag::SpamKeywordMatched);
            }
        }
        sig
    }
}
