//! Geography signal: is the report located in (or near) mangrove habitat?
//!
//! Two interchangeable strategies:
//! - zone lookup against a table of named bounding boxes (first match wins);
//! - signal fusion over nearby place names and elevation from a `GeoDataProvider`.
//!
//! Missing coordinates are neutral (0.5). Provider trouble degrades to 0.4
//! and is never propagated.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{GeoMode, GeographyConfig};
use crate::signal::{SignalDetail, SignalFlag, SignalResult};

pub const NO_COORDINATES_SCORE: f64 = 0.5;
pub const PROVIDER_UNAVAILABLE_SCORE: f64 = 0.5;
pub const DEGRADED_SCORE: f64 = 0.4;

const FUSION_BASE: f64 = 0.3;
const INDICATOR_INCREMENT: f64 = 0.2;
const LOW_ELEVATION_BONUS: f64 = 0.3;
const LOW_ELEVATION_M: f64 = 10.0;

/// Place-name fragments that suggest mangrove or coastal wetland.
pub const MANGROVE_INDICATORS: [&str; 5] = ["mangrove", "wetland", "estuary", "coastal", "lagoon"];

/// Named rectangular coastal zone (WGS84 degrees, inclusive bounds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Zone {
    pub fn new(name: &str, lat: (f64, f64), lng: (f64, f64)) -> Self {
        let mut z = Self {
            name: name.to_string(),
            min_lat: lat.0,
            max_lat: lat.1,
            min_lng: lng.0,
            max_lng: lng.1,
        };
        z.normalize();
        z
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }

    /// Swap inverted bounds so `min <= max` holds.
    pub fn normalize(&mut self) {
        if self.min_lat > self.max_lat {
            std::mem::swap(&mut self.min_lat, &mut self.max_lat);
        }
        if self.min_lng > self.max_lng {
            std::mem::swap(&mut self.min_lng, &mut self.max_lng);
        }
    }
}

/// Built-in seed of known mangrove regions, used when the config has none.
pub fn default_zones() -> Vec<Zone> {
    vec![
        Zone::new("Sundarbans", (21.5, 22.7), (88.0, 89.95)),
        Zone::new("Bhitarkanika", (20.4, 20.85), (86.7, 87.1)),
        Zone::new("Pichavaram", (11.35, 11.5), (79.7, 79.85)),
        Zone::new("Godavari-Krishna Delta", (15.7, 17.0), (80.8, 82.4)),
        Zone::new("Gulf of Kutch", (22.2, 23.1), (68.9, 70.6)),
        Zone::new("Thane Creek", (18.9, 19.3), (72.8, 73.05)),
        Zone::new("Goa Estuaries", (15.2, 15.6), (73.7, 74.0)),
        Zone::new("Vembanad Backwaters", (9.4, 10.1), (76.2, 76.5)),
        Zone::new("Andaman and Nicobar Islands", (6.7, 13.7), (92.2, 94.0)),
        Zone::new("Everglades", (24.9, 25.9), (-81.4, -80.3)),
        Zone::new("Niger Delta", (4.2, 5.6), (5.2, 7.6)),
        Zone::new("Mekong Delta", (8.5, 10.5), (104.4, 106.8)),
    ]
}

/// External place/elevation data. Implementations report whether they can be
/// used at all; the analyzer short-circuits to neutral when they cannot.
#[async_trait]
pub trait GeoDataProvider: Send + Sync {
    fn is_available(&self) -> bool;

    /// Names of natural features within `radius_m` of the point.
    async fn nearby_feature_names(&self, lat: f64, lng: f64, radius_m: u32) -> Result<Vec<String>>;

    /// Ground elevation in metres, if the provider knows it.
    async fn elevation_m(&self, lat: f64, lng: f64) -> Result<Option<f64>>;

    fn name(&self) -> &'static str;
}

/// Used when no provider key is configured.
pub struct DisabledGeoProvider;

#[async_trait]
impl GeoDataProvider for DisabledGeoProvider {
    fn is_available(&self) -> bool {
        false
    }
    async fn nearby_feature_names(&self, _lat: f64, _lng: f64, _r: u32) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
    async fn elevation_m(&self, _lat: f64, _lng: f64) -> Result<Option<f64>> {
        Ok(None)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Google Maps Places (nearby search) + Elevation APIs.
pub struct GoogleMapsProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleMapsProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("mangrove-report-validator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_key: api_key.into(),
            base_url: "https://maps.googleapis.com/maps/api".into(),
        }
    }

    /// Point at a different host (local fakes in tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Deserialize)]
struct PlacesResp {
    status: String,
    #[serde(default)]
    results: Vec<Place>,
}
#[derive(Deserialize)]
struct Place {
    #[serde(default)]
    name: String,
}
#[derive(Deserialize)]
struct ElevationResp {
    status: String,
    #[serde(default)]
    results: Vec<ElevationPoint>,
}
#[derive(Deserialize)]
struct ElevationPoint {
    elevation: f64,
}

fn check_status(api: &str, status: &str) -> Result<()> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => bail!("{api} returned status {other}"),
    }
}

#[async_trait]
impl GeoDataProvider for GoogleMapsProvider {
    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn nearby_feature_names(&self, lat: f64, lng: f64, radius_m: u32) -> Result<Vec<String>> {
        let url = format!("{}/place/nearbysearch/json", self.base_url);
        let body: PlacesResp = self
            .http
            .get(url)
            .query(&[
                ("location", format!("{lat},{lng}")),
                ("radius", radius_m.to_string()),
                ("type", "natural_feature".to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .context("places request")?
            .error_for_status()
            .context("places http status")?
            .json()
            .await
            .context("places response body")?;
        check_status("places", &body.status)?;
        Ok(body.results.into_iter().map(|p| p.name).collect())
    }

    async fn elevation_m(&self, lat: f64, lng: f64) -> Result<Option<f64>> {
        let url = format!("{}/elevation/json", self.base_url);
        let body: ElevationResp = self
            .http
            .get(url)
            .query(&[
                ("locations", format!("{lat},{lng}")),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .context("elevation request")?
            .error_for_status()
            .context("elevation http status")?
            .json()
            .await
            .context("elevation response body")?;
        check_status("elevation", &body.status)?;
        Ok(body.results.first().map(|p| p.elevation))
    }

    fn name(&self) -> &'static str {
        "google_maps"
    }
}

/// Build the provider the config asks for.
pub fn build_geo_provider(api_key: Option<String>) -> Arc<dyn GeoDataProvider> {
    match api_key {
        Some(k) => Arc::new(GoogleMapsProvider::new(k)),
        None => Arc::new(DisabledGeoProvider),
    }
}

pub struct GeographyAnalyzer {
    mode: GeoMode,
    zones: Vec<Zone>,
    miss_score: f64,
    radius_m: u32,
    provider: Arc<dyn GeoDataProvider>,
}

impl GeographyAnalyzer {
    pub fn zone_lookup(zones: Vec<Zone>, miss_score: f64) -> Self {
        Self {
            mode: GeoMode::ZoneLookup,
            zones,
            miss_score: miss_score.clamp(0.0, 1.0),
            radius_m: 5_000,
            provider: Arc::new(DisabledGeoProvider),
        }
    }

    pub fn signal_fusion(provider: Arc<dyn GeoDataProvider>, radius_m: u32) -> Self {
        Self {
            mode: GeoMode::SignalFusion,
            zones: Vec::new(),
            miss_score: 0.25,
            radius_m,
            provider,
        }
    }

    pub fn from_config(cfg: &GeographyConfig, provider: Arc<dyn GeoDataProvider>) -> Self {
        Self {
            mode: cfg.mode,
            zones: cfg.zones.clone(),
            miss_score: cfg.miss_score,
            radius_m: cfg.search_radius_m,
            provider,
        }
    }

    pub fn mode(&self) -> GeoMode {
        self.mode
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// First zone containing the point.
    pub fn find_zone(&self, lat: f64, lng: f64) -> Option<&Zone> {
        self.zones.iter().find(|z| z.contains(lat, lng))
    }

    pub async fn analyze(&self, latitude: Option<f64>, longitude: Option<f64>) -> SignalResult {
        let (lat, lng) = match (latitude, longitude) {
            (Some(lat), Some(lng)) => (lat, lng),
            _ => {
                return SignalResult::new(NO_COORDINATES_SCORE, "no coordinates provided")
                    .flag(SignalFlag::NoCoordinates)
            }
        };

        match self.mode {
            GeoMode::ZoneLookup => self.lookup(lat, lng),
            GeoMode::SignalFusion => self.fuse(lat, lng).await,
        }
    }

    fn lookup(&self, lat: f64, lng: f64) -> SignalResult {
        match self.find_zone(lat, lng) {
            Some(zone) => SignalResult::new(1.0, format!("inside known mangrove zone: {}", zone.name))
                .detail(SignalDetail::Geography {
                    zone: Some(zone.name.clone()),
                    nearby_features: None,
                    indicator_features: None,
                    elevation_m: None,
                }),
            None => SignalResult::new(self.miss_score, "outside known mangrove zones")
                .flag(SignalFlag::OutsideKnownZone),
        }
    }

    async fn fuse(&self, lat: f64, lng: f64) -> SignalResult {
        if !self.provider.is_available() {
            debug!(target: "validator", provider = self.provider.name(), "geo provider unavailable");
            return SignalResult::new(PROVIDER_UNAVAILABLE_SCORE, "geo data provider not configured")
                .flag(SignalFlag::ProviderUnavailable);
        }

        let fetched = tokio::try_join!(
            self.provider.nearby_feature_names(lat, lng, self.radius_m),
            self.provider.elevation_m(lat, lng),
        );
        let (names, elevation) = match fetched {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "validator", provider = self.provider.name(), error = %e, "geo provider failed");
                return SignalResult::new(DEGRADED_SCORE, format!("geo data error: {e}"))
                    .flag(SignalFlag::ProviderError);
            }
        };

        let (score, indicators) = fusion_score(&names, elevation);
        let low_lying = elevation.is_some_and(|e| e < LOW_ELEVATION_M);
        let elev_txt = elevation
            .map(|e| format!("{e:.1}m"))
            .unwrap_or_else(|| "unknown".into());

        let mut sig = SignalResult::new(
            score,
            format!("Coastal validation: {score:.1}, Elevation: {elev_txt}"),
        )
        .detail(SignalDetail::Geography {
            zone: None,
            nearby_features: Some(names.len()),
            indicator_features: Some(indicators),
            elevation_m: elevation,
        });
        if indicators == 0 && !low_lying {
            sig = sig.flag(SignalFlag::OutsideKnownZone);
        }
        sig
    }

    /// Result used when the analyzer itself did not finish in time.
    pub fn timed_out() -> SignalResult {
        SignalResult::new(DEGRADED_SCORE, "geography analysis timed out").flag(SignalFlag::TimedOut)
    }
}

/// Base 0.3, +0.2 per feature whose name carries an indicator, +0.3 below 10 m.
/// Returns `(score, indicator_feature_count)`.
pub fn fusion_score(feature_names: &[String], elevation_m: Option<f64>) -> (f64, usize) {
    let indicators = feature_names
        .iter()
        .filter(|n| {
            let lower = n.to_lowercase();
            MANGROVE_INDICATORS.iter().any(|k| lower.contains(k))
        })
        .count();
    let mut score = FUSION_BASE + INDICATOR_INCREMENT * indicators as f64;
    if elevation_m.is_some_and(|e| e < LOW_ELEVATION_M) {
        score += LOW_ELEVATION_BONUS;
    }
    (score.clamp(0.0, 1.0), indicators)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider {
        names: Vec<String>,
        elevation: Option<f64>,
        fail: bool,
    }

    #[async_trait]
    impl GeoDataProvider for FixedProvider {
        fn is_available(&self) -> bool {
            true
        }
        async fn nearby_feature_names(&self, _: f64, _: f64, _: u32) -> Result<Vec<String>> {
            if self.fail {
                bail!("upstream 500");
            }
            Ok(self.names.clone())
        }
        async fn elevation_m(&self, _: f64, _: f64) -> Result<Option<f64>> {
            Ok(self.elevation)
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn fusion(names: &[&str], elevation: Option<f64>, fail: bool) -> GeographyAnalyzer {
        GeographyAnalyzer::signal_fusion(
            Arc::new(FixedProvider {
                names: names.iter().map(|s| s.to_string()).collect(),
                elevation,
                fail,
            }),
            5_000,
        )
    }

    #[tokio::test]
    async fn missing_coordinates_are_neutral() {
        let a = GeographyAnalyzer::zone_lookup(default_zones(), 0.25);
        let s = a.analyze(Some(21.9), None).await;
        assert_eq!(s.score, 0.5);
        assert_eq!(s.analysis, "no coordinates provided");
        assert!(s.has_flag(SignalFlag::NoCoordinates));
    }

    #[tokio::test]
    async fn inside_zone_scores_one() {
        let a = GeographyAnalyzer::zone_lookup(default_zones(), 0.25);
        let s = a.analyze(Some(21.95), Some(88.9)).await;
        assert_eq!(s.score, 1.0);
        assert!(s.analysis.contains("Sundarbans"));
    }

    #[tokio::test]
    async fn outside_zone_scores_baseline() {
        let a = GeographyAnalyzer::zone_lookup(default_zones(), 0.25);
        let s = a.analyze(Some(28.61), Some(77.2)).await; // Delhi
        assert_eq!(s.score, 0.25);
        assert!(s.has_flag(SignalFlag::OutsideKnownZone));
    }

    #[test]
    fn first_matching_zone_wins() {
        let zones = vec![
            Zone::new("Outer", (0.0, 10.0), (0.0, 10.0)),
            Zone::new("Inner", (4.0, 6.0), (4.0, 6.0)),
        ];
        let a = GeographyAnalyzer::zone_lookup(zones, 0.25);
        assert_eq!(a.find_zone(5.0, 5.0).unwrap().name, "Outer");
    }

    #[test]
    fn fusion_score_accumulates_and_clamps() {
        let names: Vec<String> = vec!["Pichavaram Mangrove Forest".into(), "Town Hall".into()];
        assert_eq!(fusion_score(&names, None), (0.5, 1));
        let (s, _) = fusion_score(&names, Some(3.0));
        assert!((s - 0.8).abs() < 1e-9);
        let many: Vec<String> = vec![
            "Coastal Park".into(),
            "Lagoon".into(),
            "Estuary Reserve".into(),
        ];
        assert_eq!(fusion_score(&many, Some(1.0)).0, 1.0);
        assert_eq!(fusion_score(&[], Some(50.0)), (0.3, 0));
    }

    #[tokio::test]
    async fn fusion_with_indicator_is_at_least_half() {
        let a = fusion(&["Mahim Wetland"], Some(40.0), false);
        let s = a.analyze(Some(19.04), Some(72.84)).await;
        assert!(s.score >= 0.5);
        assert!(!s.has_flag(SignalFlag::OutsideKnownZone));
    }

    #[tokio::test]
    async fn fusion_without_evidence_is_flagged_outside() {
        let a = fusion(&["Shopping Mall"], Some(220.0), false);
        let s = a.analyze(Some(12.97), Some(77.59)).await;
        assert!((s.score - 0.3).abs() < 1e-9);
        assert!(s.has_flag(SignalFlag::OutsideKnownZone));
    }

    #[tokio::test]
    async fn provider_failure_degrades() {
        let a = fusion(&[], None, true);
        let s = a.analyze(Some(1.0), Some(1.0)).await;
        assert_eq!(s.score, DEGRADED_SCORE);
        assert!(s.has_flag(SignalFlag::ProviderError));
    }

    #[tokio::test]
    async fn disabled_provider_short_circuits_to_neutral() {
        let a = GeographyAnalyzer::signal_fusion(Arc::new(DisabledGeoProvider), 5_000);
        let s = a.analyze(Some(1.0), Some(1.0)).await;
        assert_eq!(s.score, PROVIDER_UNAVAILABLE_SCORE);
        assert!(s.has_flag(SignalFlag::ProviderUnavailable));
    }
}
