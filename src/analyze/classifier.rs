//! Toxicity classifier backends for the text signal.
//!
//! The analyzer asks `is_available()` first and falls back to keyword
//! matching when no backend is usable, so a missing key never fails a
//! validation.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClassifierKind, TextConfig};

#[async_trait]
pub trait TextClassifier: Send + Sync {
    fn is_available(&self) -> bool;

    /// Probability in [0,1] that `text` is toxic or spam.
    async fn toxicity(&self, text: &str) -> Result<f64>;

    fn name(&self) -> &'static str;
}

/// Default backend: never available.
pub struct DisabledClassifier;

#[async_trait]
impl TextClassifier for DisabledClassifier {
    fn is_available(&self) -> bool {
        false
    }
    async fn toxicity(&self, _text: &str) -> Result<f64> {
        bail!("classifier disabled")
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic classifier for tests and local runs.
pub struct MockClassifier {
    pub fixed: Option<f64>,
}

impl MockClassifier {
    pub fn returning(p: f64) -> Self {
        Self { fixed: Some(p) }
    }

    /// Available, but every call errors.
    pub fn failing() -> Self {
        Self { fixed: None }
    }
}

#[async_trait]
impl TextClassifier for MockClassifier {
    fn is_available(&self) -> bool {
        true
    }
    async fn toxicity(&self, _text: &str) -> Result<f64> {
        match self.fixed {
            Some(p) => Ok(p),
            None => bail!("mock classifier failure"),
        }
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Hugging Face hosted inference for a text-classification model
/// (`unitary/toxic-bert` by default).
pub struct HuggingFaceClassifier {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

/// Inference input is truncated to this many chars.
const MAX_INPUT_CHARS: usize = 512;

impl HuggingFaceClassifier {
    pub fn new(api_key: impl Into<String>, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("mangrove-report-validator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_key: api_key.into(),
            endpoint: format!("https://api-inference.huggingface.co/models/{model}"),
        }
    }
}

#[derive(Serialize)]
struct InferenceReq<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct Label {
    label: String,
    score: f64,
}

/// The API answers either `[[{label,score},..]]` or `[{label,score},..]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResp {
    Nested(Vec<Vec<Label>>),
    Flat(Vec<Label>),
}

fn toxic_score(resp: InferenceResp) -> Result<f64> {
    let labels = match resp {
        InferenceResp::Nested(mut v) => {
            if v.is_empty() {
                bail!("empty classifier response");
            }
            v.swap_remove(0)
        }
        InferenceResp::Flat(v) => v,
    };
    labels
        .iter()
        .find(|l| l.label.eq_ignore_ascii_case("toxic"))
        .map(|l| l.score.clamp(0.0, 1.0))
        .context("classifier response has no `toxic` label")
}

#[async_trait]
impl TextClassifier for HuggingFaceClassifier {
    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn toxicity(&self, text: &str) -> Result<f64> {
        let inputs: String = text.chars().take(MAX_INPUT_CHARS).collect();
        let resp: InferenceResp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&InferenceReq { inputs: &inputs })
            .send()
            .await
            .context("classifier request")?
            .error_for_status()
            .context("classifier http status")?
            .json()
            .await
            .context("classifier response body")?;
        toxic_score(resp)
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}

pub fn build_classifier(cfg: &TextConfig, api_key: Option<String>) -> Arc<dyn TextClassifier> {
    match (cfg.classifier, api_key) {
        (ClassifierKind::HuggingFace, Some(key)) => {
            Arc::new(HuggingFaceClassifier::new(key, &cfg.model))
        }
        _ => Arc::new(DisabledClassifier),
    }
}
