// src/config/mod.rs
pub mod validator;

pub use validator::{
    ClassifierKind, GeoMode, GeographyConfig, GeographyGate, PhotoConfig, PolicyKind,
    SatelliteConfig, TextConfig, ValidatorConfig,
};
