use std::sync::{Arc, Mutex, MutexGuard};

use crate::foundation::core::{Rect, Rgba8};
use crate::foundation::error::{VersecastError, VersecastResult};
use crate::render::surface::{FontDescriptor, FrameRGBA, RasterImage, Surface};

/// One call observed by a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Resize { width: u32, height: u32 },
    Clear,
    FillRect { rect: Rect, color: Rgba8 },
    Image { id: u64, dest: Rect },
    SetFont(String),
    Text { text: String, x: f64, y: f64, color: Rgba8 },
}

/// Shared view of the calls a [`RecordingSurface`] received.
#[derive(Clone, Debug, Default)]
pub struct RecordingLog {
    ops: Arc<Mutex<Vec<DrawOp>>>,
}

impl RecordingLog {
    fn lock(&self) -> MutexGuard<'_, Vec<DrawOp>> {
        self.ops.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of every recorded call.
    pub fn ops(&self) -> Vec<DrawOp> {
        self.lock().clone()
    }

    /// Number of frames started (`clear` calls).
    pub fn frames_rendered(&self) -> usize {
        self.lock().iter().filter(|op| **op == DrawOp::Clear).count()
    }

    /// Calls since the most recent `clear`.
    pub fn last_frame(&self) -> Vec<DrawOp> {
        let ops = self.lock();
        let start = ops
            .iter()
            .rposition(|op| *op == DrawOp::Clear)
            .map_or(0, |i| i + 1);
        ops[start..].to_vec()
    }

    /// Texts drawn in the most recent frame, in draw order.
    pub fn last_texts(&self) -> Vec<String> {
        self.last_frame()
            .into_iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        self.lock().clear();
    }
}

/// Headless surface that records draw calls instead of rasterizing.
///
/// Text is measured as a monospace font whose advance is half the font size. Snapshots are
/// zeroed frames whose leading bytes carry a digest of the current frame's calls, so identical
/// frames produce identical snapshots.
pub struct RecordingSurface {
    width: u32,
    height: u32,
    fonts_available: bool,
    font_size: f64,
    log: RecordingLog,
}

impl RecordingSurface {
    /// Create a recording surface with every font available.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fonts_available: true,
            font_size: 0.0,
            log: RecordingLog::default(),
        }
    }

    /// Make every `set_font` fail, as if no font were installed.
    pub fn without_fonts(mut self) -> Self {
        self.fonts_available = false;
        self
    }

    /// Handle to the recorded calls; stays valid after the surface is boxed or moved.
    pub fn log(&self) -> RecordingLog {
        self.log.clone()
    }

    fn push(&self, op: DrawOp) {
        self.log.lock().push(op);
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) -> VersecastResult<()> {
        if width == 0 || height == 0 {
            return Err(VersecastError::validation(
                "surface width/height must be non-zero",
            ));
        }
        self.width = width;
        self.height = height;
        self.push(DrawOp::Resize { width, height });
        Ok(())
    }

    fn clear(&mut self) {
        self.push(DrawOp::Clear);
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba8) {
        self.push(DrawOp::FillRect { rect, color });
    }

    fn draw_image(&mut self, image: &RasterImage, dest: Rect) {
        self.push(DrawOp::Image { id: image.id, dest });
    }

    fn set_font(&mut self, font: &FontDescriptor) -> VersecastResult<()> {
        if !self.fonts_available {
            return Err(VersecastError::render(format!(
                "font {font} is not available"
            )));
        }
        self.font_size = font.size_px;
        self.push(DrawOp::SetFont(font.to_string()));
        Ok(())
    }

    fn measure_text(&mut self, text: &str) -> f64 {
        text.chars().count() as f64 * self.font_size * 0.5
    }

    fn draw_text_centered(&mut self, text: &str, x: f64, y: f64, color: Rgba8) {
        self.push(DrawOp::Text {
            text: text.to_owned(),
            x,
            y,
            color,
        });
    }

    fn snapshot(&mut self) -> VersecastResult<FrameRGBA> {
        let digest = xxhash_rust::xxh3::xxh3_64(format!("{:?}", self.log.last_frame()).as_bytes());
        let mut data = vec![0u8; (self.width as usize) * (self.height as usize) * 4];
        let n = data.len().min(8);
        data[..n].copy_from_slice(&digest.to_le_bytes()[..n]);
        Ok(FrameRGBA {
            width: self.width,
            height: self.height,
            data,
            premultiplied: true,
        })
    }
}
