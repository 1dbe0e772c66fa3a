//! Render/export configuration snapshot.
//!
//! [`RenderConfig`] is a plain value: the player and compositor read it, never mutate it. Edits
//! produce a new snapshot through the `with_*` builders, which the owner hands back to the player.

pub(crate) mod color;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{VersecastError, VersecastResult};
use crate::voice::ProviderId;

pub use color::parse_hex_color;

/// How the frame background is painted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundMode {
    /// Fill with `background_color`.
    #[default]
    Solid,
    /// Cover-fit `background_image`.
    Image,
    /// Leave the cleared frame untouched.
    Transparent,
}

/// Output aspect ratio. Each maps to exactly one frame size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AspectRatio {
    /// 1920x1080.
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 1080x1920.
    #[serde(rename = "9:16")]
    Portrait,
    /// 1080x1080.
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    /// Ratio label, e.g. `16:9`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
        }
    }

    /// Filename-safe label, e.g. `16-9`.
    pub fn slug(self) -> String {
        self.as_str().replace(':', "-")
    }
}

impl std::str::FromStr for AspectRatio {
    type Err = VersecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            "1:1" => Ok(Self::Square),
            other => Err(VersecastError::validation(format!(
                "unknown aspect ratio \"{other}\" (expected 16:9, 9:16 or 1:1)"
            ))),
        }
    }
}

/// Export bitrate tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportQuality {
    /// 5 Mbps.
    High,
    /// 2.5 Mbps.
    #[default]
    Medium,
    /// 1 Mbps.
    Low,
}

/// Font weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    /// Regular.
    Normal,
    /// Bold.
    #[default]
    Bold,
}

/// Font style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    /// Upright.
    #[default]
    Normal,
    /// Italic.
    Italic,
}

/// Parameters of the text-to-timeline conversion.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Seconds every text line lasts regardless of length.
    pub base_time: f64,
    /// Extra seconds per character.
    pub char_multiplier: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            base_time: 2.0,
            char_multiplier: 0.1,
        }
    }
}

/// Narration settings.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Speak each segment while playing.
    pub enabled: bool,
    /// Provider used for synthesis.
    pub provider: ProviderId,
    /// Provider-specific voice id; `None` picks the provider default.
    pub voice_id: Option<String>,
}

/// Encoded background image held in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageAsset {
    id: u64,
    bytes: Arc<Vec<u8>>,
}

impl ImageAsset {
    /// Wrap encoded image bytes (PNG, JPEG, ...). Decoding happens lazily at render time.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            id: xxhash_rust::xxh3::xxh3_64(&bytes),
            bytes: Arc::new(bytes),
        }
    }

    /// Read an image file.
    pub fn from_path(path: &Path) -> VersecastResult<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read background image '{}'", path.display()))?;
        Ok(Self::new(bytes))
    }

    /// Content hash of the encoded bytes.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Every visual and export parameter consumed by the core.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub background_mode: BackgroundMode,
    pub background_color: Rgba8,
    #[serde(skip)]
    pub background_image: Option<ImageAsset>,
    pub text_color: Rgba8,
    /// Font size in pixels.
    pub font_size: f64,
    pub font_family: String,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    /// Vertical text anchor as a percentage of frame height.
    pub text_y: f64,
    pub aspect_ratio: AspectRatio,
    pub export_quality: ExportQuality,
    pub timing: TimingConfig,
    pub narration: NarrationConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background_mode: BackgroundMode::Solid,
            background_color: Rgba8::rgb(0x11, 0x18, 0x27),
            background_image: None,
            text_color: Rgba8::rgb(255, 255, 255),
            font_size: 60.0,
            font_family: "Arial".to_owned(),
            font_weight: FontWeight::Bold,
            font_style: FontStyle::Normal,
            text_y: 50.0,
            aspect_ratio: AspectRatio::Landscape,
            export_quality: ExportQuality::Medium,
            timing: TimingConfig::default(),
            narration: NarrationConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Parse a JSON document, filling absent fields with defaults.
    pub fn from_json_str(s: &str) -> VersecastResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| VersecastError::validation(format!("invalid config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a JSON config file.
    pub fn from_json_path(path: &Path) -> VersecastResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Reject values no frame can be rendered with.
    pub fn validate(&self) -> VersecastResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(VersecastError::validation(
                "font_size must be finite and > 0",
            ));
        }
        if !self.text_y.is_finite() {
            return Err(VersecastError::validation("text_y must be finite"));
        }
        if !self.timing.base_time.is_finite() || !self.timing.char_multiplier.is_finite() {
            return Err(VersecastError::validation("timing values must be finite"));
        }
        if self.timing.base_time <= 0.0 {
            return Err(VersecastError::validation("timing.base_time must be > 0"));
        }
        if self.timing.char_multiplier < 0.0 {
            return Err(VersecastError::validation("timing.char_multiplier must be >= 0"));
        }
        if self.font_family.trim().is_empty() {
            return Err(VersecastError::validation("font_family must be non-empty"));
        }
        Ok(())
    }

    pub fn with_background_mode(mut self, mode: BackgroundMode) -> Self {
        self.background_mode = mode;
        self
    }

    pub fn with_background_color(mut self, color: Rgba8) -> Self {
        self.background_color = color;
        self
    }

    /// Attach an image and switch to [`BackgroundMode::Image`].
    pub fn with_background_image(mut self, image: ImageAsset) -> Self {
        self.background_image = Some(image);
        self.background_mode = BackgroundMode::Image;
        self
    }

    pub fn with_text_color(mut self, color: Rgba8) -> Self {
        self.text_color = color;
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn with_font(mut self, weight: FontWeight, style: FontStyle) -> Self {
        self.font_weight = weight;
        self.font_style = style;
        self
    }

    pub fn with_text_y(mut self, percent: f64) -> Self {
        self.text_y = percent;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect: AspectRatio) -> Self {
        self.aspect_ratio = aspect;
        self
    }

    pub fn with_export_quality(mut self, quality: ExportQuality) -> Self {
        self.export_quality = quality;
        self
    }

    pub fn with_timing(mut self, base_time: f64, char_multiplier: f64) -> Self {
        self.timing = TimingConfig {
            base_time,
            char_multiplier,
        };
        self
    }

    pub fn with_narration(mut self, narration: NarrationConfig) -> Self {
        self.narration = narration;
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/render_config.rs"]
mod tests;
