use std::collections::HashSet;

use crate::config::{AspectRatio, BackgroundMode, RenderConfig};
use crate::foundation::core::{Canvas, Rect};
use crate::layout::{line_baselines, wrap_text};
use crate::render::decode::decode_image;
use crate::render::surface::{FontDescriptor, RasterImage, Surface};
use crate::timeline::Timeline;

/// Horizontal margin (sum of both sides) kept free of text.
pub const TEXT_MARGIN_PX: f64 = 100.0;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.5;

/// Frame size for an aspect ratio. No other resolutions exist.
pub fn frame_size(aspect: AspectRatio) -> Canvas {
    match aspect {
        AspectRatio::Landscape => Canvas {
            width: 1920,
            height: 1080,
        },
        AspectRatio::Portrait => Canvas {
            width: 1080,
            height: 1920,
        },
        AspectRatio::Square => Canvas {
            width: 1080,
            height: 1080,
        },
    }
}

/// Destination rect that covers `canvas` with an `img_w x img_h` image, centered.
pub fn cover_rect(canvas: Canvas, img_w: u32, img_h: u32) -> Rect {
    let cw = f64::from(canvas.width);
    let ch = f64::from(canvas.height);
    let scale = (cw / f64::from(img_w)).max(ch / f64::from(img_h));
    let w = f64::from(img_w) * scale;
    let h = f64::from(img_h) * scale;
    let x = (cw - w) / 2.0;
    let y = (ch - h) / 2.0;
    Rect::new(x, y, x + w, y + h)
}

/// Paints one frame: background, then the wrapped text of the segment active at `time`.
///
/// Rendering never fails. An undecodable background image is skipped and an unavailable font
/// omits the text; each distinct cause is logged once.
#[derive(Default)]
pub struct Compositor {
    decoded: Option<(u64, Option<RasterImage>)>,
    warned: HashSet<String>,
}

impl Compositor {
    /// Create a compositor with empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the frame for `time`. Same inputs always produce the same frame.
    pub fn render(
        &mut self,
        surface: &mut dyn Surface,
        time: f64,
        timeline: &Timeline,
        config: &RenderConfig,
    ) {
        let canvas = frame_size(config.aspect_ratio);
        if (surface.width(), surface.height()) != (canvas.width, canvas.height)
            && let Err(e) = surface.resize(canvas.width, canvas.height)
        {
            self.warn_once(format!("resize:{e}"), || {
                tracing::warn!(error = %e, "surface resize failed, rendering at current size");
            });
        }
        let canvas = Canvas {
            width: surface.width(),
            height: surface.height(),
        };

        surface.clear();
        self.paint_background(surface, canvas, config);

        let Some(segment) = timeline.active_segment(time) else {
            return;
        };
        if segment.text.is_empty() {
            return;
        }
        self.paint_text(surface, canvas, &segment.text, config);
    }

    fn paint_background(&mut self, surface: &mut dyn Surface, canvas: Canvas, config: &RenderConfig) {
        let full = Rect::new(0.0, 0.0, f64::from(canvas.width), f64::from(canvas.height));
        match config.background_mode {
            BackgroundMode::Solid => surface.fill_rect(full, config.background_color),
            BackgroundMode::Image => {
                if let Some(img) = self.background_image(config) {
                    surface.draw_image(&img, cover_rect(canvas, img.width, img.height));
                }
            }
            BackgroundMode::Transparent => {}
        }
    }

    fn background_image(&mut self, config: &RenderConfig) -> Option<RasterImage> {
        let asset = config.background_image.as_ref()?;
        if let Some((id, img)) = &self.decoded
            && *id == asset.id()
        {
            return img.clone();
        }
        let decoded = match decode_image(asset.bytes()) {
            Ok(img) if img.width > 0 && img.height > 0 => Some(img),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "background image skipped");
                None
            }
        };
        self.decoded = Some((asset.id(), decoded.clone()));
        decoded
    }

    fn paint_text(
        &mut self,
        surface: &mut dyn Surface,
        canvas: Canvas,
        text: &str,
        config: &RenderConfig,
    ) {
        let font = FontDescriptor {
            style: config.font_style,
            weight: config.font_weight,
            size_px: config.font_size,
            family: config.font_family.clone(),
        };
        if let Err(e) = surface.set_font(&font) {
            self.warn_once(font.to_string(), || {
                tracing::warn!(font = %font, error = %e, "text omitted");
            });
            return;
        }

        let width = f64::from(canvas.width);
        let anchor_y = f64::from(canvas.height) * config.text_y / 100.0;
        let line_height = config.font_size * LINE_HEIGHT_FACTOR;
        let lines = wrap_text(|s| surface.measure_text(s), text, width - TEXT_MARGIN_PX);
        let baselines = line_baselines(lines.len(), line_height, anchor_y);
        for (line, y) in lines.iter().zip(baselines) {
            surface.draw_text_centered(line, width / 2.0, y, config.text_color);
        }
    }

    fn warn_once(&mut self, key: String, emit: impl FnOnce()) {
        if self.warned.insert(key) {
            emit();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
