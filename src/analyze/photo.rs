//! Photo signal: sharpness, vegetation content and embedded metadata.
//!
//! Bytes come from a `PhotoStore`; decoding and pixel work run on the
//! blocking pool. Every failure maps to a low finite score with a flag.

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::imageops::FilterType;
use image::{GrayImage, ImageError, ImageReader, Limits, RgbImage};
use std::collections::HashMap;
use std::io::{Cursor, ErrorKind};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::config::PhotoConfig;
use crate::report::PhotoRef;
use crate::signal::{SignalDetail, SignalFlag, SignalResult};

pub const NO_PHOTO_SCORE: f64 = 0.7;
pub const MISSING_SCORE: f64 = 0.3;
pub const INVALID_SCORE: f64 = 0.2;
pub const FAILED_SCORE: f64 = 0.4;

const EXIF_PRESENT: f64 = 0.8;
const EXIF_ABSENT: f64 = 0.4;
const LAPLACIAN_SCALE: f64 = 1000.0;
const GREEN_SCALE: f64 = 3.0;

/// Where uploaded photo bytes live.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// `Ok(None)` when the handle does not resolve to a stored photo.
    async fn load(&self, handle: &PhotoRef) -> Result<Option<Vec<u8>>>;
}

/// Photos stored as plain files under one upload directory.
pub struct FsPhotoStore {
    root: PathBuf,
}

impl FsPhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// A handle is a bare file name; anything that could leave `root` is refused.
    fn resolve(&self, handle: &str) -> Option<PathBuf> {
        let bad = handle.is_empty()
            || handle.contains('/')
            || handle.contains('\\')
            || handle.contains("..");
        (!bad).then(|| self.root.join(handle))
    }
}

#[async_trait]
impl PhotoStore for FsPhotoStore {
    async fn load(&self, handle: &PhotoRef) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.resolve(handle.as_str()) else {
            warn!(target: "validator", "rejected photo handle with path components");
            return Ok(None);
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading photo {}", path.display())),
        }
    }
}

/// In-memory store for tests and embedding callers.
#[derive(Default)]
pub struct MemoryPhotoStore {
    photos: HashMap<String, Vec<u8>>,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handle: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.photos.insert(handle.into(), bytes);
        self
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn load(&self, handle: &PhotoRef) -> Result<Option<Vec<u8>>> {
        Ok(self.photos.get(handle.as_str()).cloned())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifSummary {
    pub has_exif: bool,
    pub has_gps: bool,
    pub captured_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoMeasurements {
    pub technical_quality: f64,
    pub environmental_content: f64,
    pub exif: ExifSummary,
}

impl PhotoMeasurements {
    pub fn metadata_score(&self) -> f64 {
        if self.exif.has_exif {
            EXIF_PRESENT
        } else {
            EXIF_ABSENT
        }
    }

    pub fn authenticity(&self) -> f64 {
        (self.technical_quality + self.environmental_content + self.metadata_score()) / 3.0
    }
}

/// Default ceiling on either edge of an image accepted for decoding.
pub const DEFAULT_DECODE_LIMIT: u32 = 12_000;

/// Decode and measure. CPU-bound; call from a blocking context.
///
/// The header is checked against `decode_limit` before any pixel buffer is
/// allocated; oversized images fail with a limits error.
pub fn measure(
    bytes: &[u8],
    max_dimension: u32,
    decode_limit: u32,
) -> image::ImageResult<PhotoMeasurements> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(decode_limit);
    limits.max_image_height = Some(decode_limit);

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?;
    reader.limits(limits);
    let mut img = reader.decode()?;
    if img.width().max(img.height()) > max_dimension {
        img = img.resize(max_dimension, max_dimension, FilterType::Triangle);
    }
    Ok(PhotoMeasurements {
        technical_quality: (laplacian_variance(&img.to_luma8()) / LAPLACIAN_SCALE).min(1.0),
        environmental_content: (green_ratio(&img.to_rgb8()) * GREEN_SCALE).min(1.0),
        exif: read_exif(bytes),
    })
}

fn read_exif(bytes: &[u8]) -> ExifSummary {
    let Ok(exif) = exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) else {
        return ExifSummary::default();
    };
    let has_gps = exif
        .get_field(exif::Tag::GPSLatitude, exif::In::PRIMARY)
        .is_some();
    let captured_at = exif
        .get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)
        .or_else(|| exif.get_field(exif::Tag::DateTime, exif::In::PRIMARY))
        .map(|f| f.display_value().to_string());
    ExifSummary {
        has_exif: true,
        has_gps,
        captured_at,
    }
}

/// Variance of the 4-neighbour Laplacian over interior pixels.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let px = |x: u32, y: u32| f64::from(gray.get_pixel(x, y)[0]);
    let mut n: f64 = 0.0;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1) - 4.0 * px(x, y);
            n += 1.0;
            sum += lap;
            sum_sq += lap * lap;
        }
    }
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Fraction of pixels in the vegetation-green band
/// (H 40–80 on a 0–180 hue scale, S and V 50–255).
pub fn green_ratio(rgb: &RgbImage) -> f64 {
    let total = u64::from(rgb.width()) * u64::from(rgb.height());
    if total == 0 {
        return 0.0;
    }
    let green = rgb
        .pixels()
        .filter(|p| {
            let (h, s, v) = hsv_half_hue(p[0], p[1], p[2]);
            (40.0..=80.0).contains(&h) && s >= 50.0 && v >= 50.0
        })
        .count() as u64;
    green as f64 / total as f64
}

/// RGB → (H in [0,180), S in [0,255], V in [0,255]).
fn hsv_half_hue(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let s = if max == 0.0 { 0.0 } else { 255.0 * delta / max };
    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }
    (h / 2.0, s, max)
}

pub struct PhotoAnalyzer {
    store: Arc<dyn PhotoStore>,
    max_dimension: u32,
    decode_limit: u32,
}

impl PhotoAnalyzer {
    pub fn new(store: Arc<dyn PhotoStore>, max_dimension: u32) -> Self {
        let max_dimension = max_dimension.max(1);
        Self {
            store,
            max_dimension,
            decode_limit: DEFAULT_DECODE_LIMIT.max(max_dimension),
        }
    }

    pub fn with_decode_limit(mut self, px: u32) -> Self {
        self.decode_limit = px.max(self.max_dimension);
        self
    }

    pub fn from_config(cfg: &PhotoConfig) -> Self {
        Self::new(Arc::new(FsPhotoStore::new(&cfg.upload_dir)), cfg.max_dimension)
            .with_decode_limit(cfg.max_decode_dimension)
    }

    pub async fn analyze(&self, photo: Option<&PhotoRef>) -> SignalResult {
        let Some(handle) = photo else {
            return SignalResult::new(NO_PHOTO_SCORE, "no photo provided").flag(SignalFlag::NoPhoto);
        };

        let bytes = match self.store.load(handle).await {
            Ok(Some(b)) => b,
            Ok(None) => {
                return SignalResult::new(MISSING_SCORE, "photo not found in upload store")
                    .flag(SignalFlag::PhotoMissing)
            }
            Err(e) => {
                warn!(target: "validator", signal = "photo_analysis", error = %e, "photo store failed");
                return Self::failed("photo store error");
            }
        };

        let (max, limit) = (self.max_dimension, self.decode_limit);
        let measured = tokio::task::spawn_blocking(move || measure(&bytes, max, limit)).await;
        match measured {
            Ok(Ok(m)) => Self::scored(&m),
            Ok(Err(e)) => SignalResult::new(INVALID_SCORE, format!("unreadable image: {e}"))
                .flag(SignalFlag::PhotoInvalid),
            Err(e) => {
                warn!(target: "validator", signal = "photo_analysis", error = %e, "photo worker failed");
                Self::failed("photo analysis worker failed")
            }
        }
    }

    fn scored(m: &PhotoMeasurements) -> SignalResult {
        let auth = m.authenticity();
        let mut sig = SignalResult::new(
            auth,
            format!(
                "Quality: {:.2}, Environment: {:.2}, Metadata: {:.2}",
                m.technical_quality,
                m.environmental_content,
                m.metadata_score()
            ),
        )
        .detail(SignalDetail::Photo {
            technical_quality: m.technical_quality,
            environmental_content: m.environmental_content,
            metadata_score: m.metadata_score(),
            authenticity_score: auth,
            has_exif: m.exif.has_exif,
            has_gps: m.exif.has_gps,
            captured_at: m.exif.captured_at.clone(),
        });
        if !m.exif.has_exif {
            sig = sig.flag(SignalFlag::NoMetadata);
        }
        sig
    }

    fn failed(reason: &str) -> SignalResult {
        SignalResult::new(FAILED_SCORE, reason).flag(SignalFlag::AnalysisFailed)
    }

    pub fn timed_out() -> SignalResult {
        Self::failed("photo analysis timed out").flag(SignalFlag::TimedOut)
    }
}

/// Encode an image as PNG bytes; shared by tests.
#[cfg(test)]
pub(crate) fn png_bytes(img: image::DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}
