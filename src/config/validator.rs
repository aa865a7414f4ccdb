// src/config/validator.rs
//! Validator configuration: `config/validator.toml` (or JSON), env overrides,
//! built-in defaults when no file exists.
//!
//! Lookup order for the file:
//!   1) $VALIDATOR_CONFIG_PATH
//!   2) config/validator.toml
//!
//! `api_key = "ENV"` means: read GOOGLE_MAPS_API_KEY / HUGGINGFACE_API_KEY.
//! A missing key leaves that backend unavailable; it never fails startup.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use std::{env, fs};

use crate::analyze::geography::{default_zones, Zone};

pub const DEFAULT_CONFIG_PATH: &str = "config/validator.toml";
pub const ENV_CONFIG_PATH: &str = "VALIDATOR_CONFIG_PATH";
pub const ENV_POLICY: &str = "VALIDATOR_POLICY";
pub const ENV_GEOGRAPHY_GATE: &str = "VALIDATOR_GEOGRAPHY_GATE";
pub const ENV_GOOGLE_MAPS_KEY: &str = "GOOGLE_MAPS_API_KEY";
pub const ENV_HUGGINGFACE_KEY: &str = "HUGGINGFACE_API_KEY";

const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Which combination policy decides the status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    WeightedSum,
    ThresholdGate,
    KeywordSwitch,
}

impl FromStr for PolicyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted_sum" => Ok(Self::WeightedSum),
            "threshold_gate" => Ok(Self::ThresholdGate),
            "keyword_switch" => Ok(Self::KeywordSwitch),
            other => bail!("unknown policy `{other}`"),
        }
    }
}

/// Whether a location outside known zones lowers confidence or forces `flagged`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeographyGate {
    #[default]
    Advisory,
    HardGate,
}

impl FromStr for GeographyGate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(Self::Advisory),
            "hard_gate" => Ok(Self::HardGate),
            other => bail!("unknown geography gate `{other}`"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoMode {
    #[default]
    ZoneLookup,
    SignalFusion,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    Disabled,
    HuggingFace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeographyConfig {
    pub mode: GeoMode,
    /// Score for coordinates outside every configured zone.
    pub miss_score: f64,
    pub search_radius_m: u32,
    pub api_key: String,
    pub zones: Vec<Zone>,
}

impl Default for GeographyConfig {
    fn default() -> Self {
        Self {
            mode: GeoMode::default(),
            miss_score: 0.25,
            search_radius_m: 5_000,
            api_key: "ENV".into(),
            zones: default_zones(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub classifier: ClassifierKind,
    pub api_key: String,
    pub model: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierKind::default(),
            api_key: "ENV".into(),
            model: "unitary/toxic-bert".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    pub upload_dir: PathBuf,
    /// Longest edge (px) analysed; larger images are downscaled first.
    pub max_dimension: u32,
    /// Images wider or taller than this are refused before decoding.
    pub max_decode_dimension: u32,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_dimension: 2_048,
            max_decode_dimension: 12_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SatelliteConfig {
    pub score_with_coordinates: f64,
    pub score_without_coordinates: f64,
}

impl Default for SatelliteConfig {
    fn default() -> Self {
        Self {
            score_with_coordinates: 0.6,
            score_without_coordinates: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub policy: PolicyKind,
    pub geography_gate: GeographyGate,
    pub analyzer_timeout_ms: u64,
    /// Force `flagged` under the weighted-sum policy when the text spam indicator fires.
    pub spam_veto: bool,
    pub geography: GeographyConfig,
    pub text: TextConfig,
    pub photo: PhotoConfig,
    pub satellite: SatelliteConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            geography_gate: GeographyGate::default(),
            analyzer_timeout_ms: DEFAULT_TIMEOUT_MS,
            spam_veto: true,
            geography: GeographyConfig::default(),
            text: TextConfig::default(),
            photo: PhotoConfig::default(),
            satellite: SatelliteConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Load using $VALIDATOR_CONFIG_PATH or the default path; fall back to
    /// built-in defaults if the default file is absent.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let path = PathBuf::from(p);
                if !path.exists() {
                    bail!("{ENV_CONFIG_PATH} points to non-existent path {}", path.display());
                }
                Self::load_from_file(&path)?
            }
            Err(_) => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load_from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    /// Parse an explicit file; `.json` is read as JSON, anything else as TOML.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading validator config from {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let cfg = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        };
        cfg.with_context(|| format!("parsing validator config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        Ok(cfg.sanitized())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(p) = env::var(ENV_POLICY) {
            self.policy = p.parse()?;
        }
        if let Ok(g) = env::var(ENV_GEOGRAPHY_GATE) {
            self.geography_gate = g.parse()?;
        }
        Ok(())
    }

    /// Keep values inside their documented ranges.
    fn sanitized(mut self) -> Self {
        if self.analyzer_timeout_ms == 0 {
            self.analyzer_timeout_ms = DEFAULT_TIMEOUT_MS;
        }
        self.geography.miss_score = clamp_score(self.geography.miss_score, 0.25);
        if self.geography.search_radius_m == 0 {
            self.geography.search_radius_m = 5_000;
        }
        for z in &mut self.geography.zones {
            z.normalize();
        }
        if self.photo.max_dimension == 0 {
            self.photo.max_dimension = 2_048;
        }
        if self.photo.max_decode_dimension < self.photo.max_dimension {
            self.photo.max_decode_dimension = self.photo.max_dimension;
        }
        self.satellite.score_with_coordinates =
            clamp_score(self.satellite.score_with_coordinates, 0.6);
        self.satellite.score_without_coordinates =
            clamp_score(self.satellite.score_without_coordinates, 0.5);
        self
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout_ms)
    }

    pub fn geo_api_key(&self) -> Option<String> {
        resolve_key(&self.geography.api_key, ENV_GOOGLE_MAPS_KEY)
    }

    pub fn text_api_key(&self) -> Option<String> {
        resolve_key(&self.text.api_key, ENV_HUGGINGFACE_KEY)
    }
}

fn clamp_score(x: f64, fallback: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// "ENV" → environment variable; anything else is taken literally; blank → none.
fn resolve_key(raw: &str, env_name: &str) -> Option<String> {
    let raw = raw.trim();
    let key = if raw.eq_ignore_ascii_case("env") {
        env::var(env_name).unwrap_or_default()
    } else {
        raw.to_string()
    };
    let key = key.trim().to_string();
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_weighted_sum_advisory_zone_lookup() {
        let c = ValidatorConfig::default();
        assert_eq!(c.policy, PolicyKind::WeightedSum);
        assert_eq!(c.geography_gate, GeographyGate::Advisory);
        assert_eq!(c.geography.mode, GeoMode::ZoneLookup);
        assert!(!c.geography.zones.is_empty());
        assert!(c.spam_veto);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let c = ValidatorConfig::from_toml_str(
            r#"
policy = "threshold_gate"
analyzer_timeout_ms = 0

[geography]
miss_score = 3.0

[[geography.zones]]
name = "Test Delta"
min_lat = 10.0
max_lat = 9.0
min_lng = 80.0
max_lng = 81.0
"#,
        )
        .unwrap();
        assert_eq!(c.policy, PolicyKind::ThresholdGate);
        assert_eq!(c.analyzer_timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(c.geography.miss_score, 1.0);
        assert_eq!(c.geography.zones.len(), 1);
        let z = &c.geography.zones[0];
        assert!(z.min_lat <= z.max_lat, "inverted bounds are swapped");
        assert_eq!(c.text, TextConfig::default());
    }

    #[test]
    fn json_config_is_accepted() {
        let c = ValidatorConfig::from_json_str(r#"{"geography_gate":"hard_gate"}"#).unwrap();
        assert_eq!(c.geography_gate, GeographyGate::HardGate);
    }

    #[test]
    fn unknown_policy_is_an_error() {
        assert!(ValidatorConfig::from_toml_str(r#"policy = "coin_flip""#).is_err());
        assert!("coin_flip".parse::<PolicyKind>().is_err());
        assert_eq!(
            " Keyword_Switch ".parse::<PolicyKind>().unwrap(),
            PolicyKind::KeywordSwitch
        );
    }

    #[test]
    fn literal_keys_are_used_and_blank_means_none() {
        assert_eq!(resolve_key("abc123", "UNUSED_VAR"), Some("abc123".into()));
        assert_eq!(resolve_key("   ", "UNUSED_VAR"), None);
    }
}
