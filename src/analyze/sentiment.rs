use once_cell::sync::Lazy;
use std::collections::HashMap;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// Largest absolute weight in the lexicon; used to scale polarity into [-1,1].
const MAX_WEIGHT: f64 = 3.0;

/// Lexicon sentiment with short-range negation.
#[derive(Debug, Clone, Default)]
pub struct SentimentScorer;

impl SentimentScorer {
    pub fn new() -> Self {
        Self
    }

    /// Returns `(raw_sum, scored_tokens)`. A negator in the three preceding
    /// tokens flips the sign of a scored word.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut sum = 0;
        let mut scored = 0;

        for (i, tok) in tokens.iter().enumerate() {
            let base = LEXICON.get(tok.as_str()).copied().unwrap_or(0);
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(&tokens[i - k]));
            sum += if negated { -base } else { base };
            scored += 1;
        }

        (sum, scored)
    }

    /// Polarity in [-1,1]; 0 when no token scores.
    pub fn polarity(&self, text: &str) -> f64 {
        let (sum, scored) = self.score_text(text);
        if scored == 0 {
            return 0.0;
        }
        (sum as f64 / (MAX_WEIGHT * scored as f64)).clamp(-1.0, 1.0)
    }
}

/// Lower-cased tokens; apostrophes stay inside words so "isn't" survives.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "weren't"
            | "won't"
            | "can't"
            | "cannot"
            | "without"
    )
}
