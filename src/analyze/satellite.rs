//! Satellite corroboration stand-in. No imagery backend yet: the signal is a
//! fixed prior that is slightly higher when the report is geolocated.

use crate::config::SatelliteConfig;
use crate::signal::{SignalDetail, SignalResult};

/// Vegetation index reported while no change detection runs.
const PLACEHOLDER_NDVI: f64 = 0.4;

#[derive(Debug, Clone)]
pub struct SatelliteProxy {
    with_coordinates: f64,
    without_coordinates: f64,
}

impl Default for SatelliteProxy {
    fn default() -> Self {
        Self::from_config(&SatelliteConfig::default())
    }
}

impl SatelliteProxy {
    pub fn from_config(cfg: &SatelliteConfig) -> Self {
        Self {
            with_coordinates: cfg.score_with_coordinates,
            without_coordinates: cfg.score_without_coordinates,
        }
    }

    pub fn analyze(&self, has_coordinates: bool) -> SignalResult {
        let (score, analysis) = if has_coordinates {
            (self.with_coordinates, "no change detected (imagery proxy)")
        } else {
            (self.without_coordinates, "no coordinates for imagery lookup")
        };
        SignalResult::new(score, analysis).detail(SignalDetail::Satellite {
            change_detected: false,
            vegetation_index: Some(PLACEHOLDER_NDVI),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_priors() {
        let p = SatelliteProxy::default();
        assert_eq!(p.analyze(true).score, 0.6);
        assert_eq!(p.analyze(false).score, 0.5);
    }
}
