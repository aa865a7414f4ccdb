// src/analyze/mod.rs
//! Per-signal analyzers. Each turns one aspect of a report into a `SignalResult`.

pub mod classifier;
pub mod geography;
pub mod history;
pub mod photo;
pub mod satellite;
pub mod sentiment;
pub mod text;

pub use classifier::{
    build_classifier, DisabledClassifier, HuggingFaceClassifier, MockClassifier, TextClassifier,
};
pub use geography::{
    build_geo_provider, default_zones, DisabledGeoProvider, GeoDataProvider, GeographyAnalyzer,
    GoogleMapsProvider, Zone,
};
pub use history::HistoryAnalyzer;
pub use photo::{FsPhotoStore, MemoryPhotoStore, PhotoAnalyzer, PhotoStore};
pub use satellite::SatelliteProxy;
pub use text::TextAnalyzer;
