use std::fmt;
use std::sync::Arc;

use crate::config::{FontStyle, FontWeight};
use crate::foundation::core::{Rect, Rgba8};
use crate::foundation::error::VersecastResult;

/// A rendered frame in RGBA8 format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Stable content digest, handy for determinism checks.
    pub fn digest(&self) -> u64 {
        xxhash_rust::xxh3::xxh3_64(&self.data)
    }
}

/// Font selection handed to [`Surface::set_font`].
#[derive(Clone, Debug, PartialEq)]
pub struct FontDescriptor {
    pub style: FontStyle,
    pub weight: FontWeight,
    pub size_px: f64,
    pub family: String,
}

impl fmt::Display for FontDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match self.style {
            FontStyle::Normal => "normal",
            FontStyle::Italic => "italic",
        };
        let weight = match self.weight {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        };
        write!(f, "{style} {weight} {}px \"{}\"", self.size_px, self.family)
    }
}

/// Decoded raster image in premultiplied RGBA8, identified by a content hash.
#[derive(Clone, Debug)]
pub struct RasterImage {
    /// Content hash of the source bytes, used as a cache key by surfaces.
    pub id: u64,
    pub width: u32,
    pub height: u32,
    /// Row-major premultiplied RGBA8 pixels.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Abstract 2D raster target.
///
/// Drawing calls are infallible; a surface that cannot honor one skips it. The only fallible
/// operations are those whose failure the caller must react to (font selection, geometry and
/// readback).
pub trait Surface: Send {
    /// Current width in pixels.
    fn width(&self) -> u32;
    /// Current height in pixels.
    fn height(&self) -> u32;
    /// Change the frame size. Content is discarded.
    fn resize(&mut self, width: u32, height: u32) -> VersecastResult<()>;
    /// Reset every pixel to transparent.
    fn clear(&mut self);
    /// Fill `rect` with a solid color.
    fn fill_rect(&mut self, rect: Rect, color: Rgba8);
    /// Draw `image` scaled into `dest`.
    fn draw_image(&mut self, image: &RasterImage, dest: Rect);
    /// Select the font used by subsequent text calls.
    fn set_font(&mut self, font: &FontDescriptor) -> VersecastResult<()>;
    /// Advance width of `text` in the current font.
    fn measure_text(&mut self, text: &str) -> f64;
    /// Draw `text` horizontally centered on `x`, vertically centered on `y`.
    fn draw_text_centered(&mut self, text: &str, x: f64, y: f64, color: Rgba8);
    /// Read back the current frame.
    fn snapshot(&mut self) -> VersecastResult<FrameRGBA>;
}
