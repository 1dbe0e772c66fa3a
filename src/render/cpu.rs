use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{FontStyle, FontWeight};
use crate::foundation::core::{Rect, Rgba8};
use crate::foundation::error::{VersecastError, VersecastResult};
use crate::render::surface::{FontDescriptor, FrameRGBA, RasterImage, Surface};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct TextBrush {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

/// One registered font file.
///
/// Every face keeps its own Parley font context so shaping can only ever resolve to this face and
/// glyph ids always match the font data handed to `vello_cpu`.
struct FontFace {
    family: String,
    weight: FontWeight,
    style: FontStyle,
    parley_family: String,
    font_ctx: parley::FontContext,
    data: vello_cpu::peniko::FontData,
}

#[derive(Clone, Copy, Debug)]
struct ActiveFont {
    face: usize,
    size_px: f32,
}

/// Software surface backed by `vello_cpu`, with Parley text shaping.
///
/// Fonts are never discovered from the system: callers register font files under the family
/// name a [`FontDescriptor`] will ask for.
pub struct CpuSurface {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
    layout_ctx: parley::LayoutContext<TextBrush>,
    faces: Vec<FontFace>,
    active: Option<ActiveFont>,
    image_cache: HashMap<u64, vello_cpu::Image>,
}

impl CpuSurface {
    /// Create a transparent surface of the given size.
    pub fn new(width: u32, height: u32) -> VersecastResult<Self> {
        let (w, h) = surface_dims(width, height)?;
        Ok(Self {
            width: w,
            height: h,
            ctx: vello_cpu::RenderContext::new(w, h),
            layout_ctx: parley::LayoutContext::new(),
            faces: Vec::new(),
            active: None,
            image_cache: HashMap::new(),
        })
    }

    /// Register a font file under `family` for the given weight/style slot.
    ///
    /// Returns the family name embedded in the font file.
    pub fn register_font(
        &mut self,
        family: &str,
        weight: FontWeight,
        style: FontStyle,
        bytes: Vec<u8>,
    ) -> VersecastResult<String> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| VersecastError::render("no font families registered from font bytes"))?;
        let parley_family = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| VersecastError::render("registered font family has no name"))?
            .to_string();

        tracing::debug!(family, embedded = %parley_family, ?weight, ?style, "font registered");
        self.faces.push(FontFace {
            family: family.trim().to_lowercase(),
            weight,
            style,
            parley_family: parley_family.clone(),
            font_ctx,
            data: vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), 0),
        });
        Ok(parley_family)
    }

    fn find_face(&self, font: &FontDescriptor) -> Option<usize> {
        let family = font.family.trim().to_lowercase();
        let family = family.as_str();
        let candidates = || {
            self.faces
                .iter()
                .enumerate()
                .filter(move |(_, f)| f.family == family)
        };
        candidates()
            .find(|(_, f)| f.weight == font.weight && f.style == font.style)
            .or_else(|| candidates().find(|(_, f)| f.weight == font.weight))
            .or_else(|| candidates().next())
            .map(|(i, _)| i)
    }

    fn layout(&mut self, text: &str, brush: TextBrush) -> Option<(parley::Layout<TextBrush>, usize)> {
        let active = self.active?;
        let face = &mut self.faces[active.face];
        let family = face.parley_family.clone();
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut face.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(active.size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));
        let mut layout: parley::Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        Some((layout, active.face))
    }

    fn image_paint(&mut self, image: &RasterImage) -> VersecastResult<vello_cpu::Image> {
        if let Some(img) = self.image_cache.get(&image.id) {
            return Ok(img.clone());
        }
        let pixmap = pixmap_from_premul_bytes(&image.rgba8_premul, image.width, image.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.image_cache.insert(image.id, paint.clone());
        Ok(paint)
    }
}

impl Surface for CpuSurface {
    fn width(&self) -> u32 {
        u32::from(self.width)
    }

    fn height(&self) -> u32 {
        u32::from(self.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> VersecastResult<()> {
        let (w, h) = surface_dims(width, height)?;
        if (w, h) != (self.width, self.height) {
            self.ctx = vello_cpu::RenderContext::new(w, h);
            self.width = w;
            self.height = h;
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.ctx.reset();
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba8) {
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            rect.x0, rect.y0, rect.x1, rect.y1,
        ));
    }

    fn draw_image(&mut self, image: &RasterImage, dest: Rect) {
        if image.width == 0 || image.height == 0 || dest.width() <= 0.0 || dest.height() <= 0.0 {
            return;
        }
        let paint = match self.image_paint(image) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "skipping image draw");
                return;
            }
        };
        let sx = dest.width() / f64::from(image.width);
        let sy = dest.height() / f64::from(image.height);
        let tr = vello_cpu::kurbo::Affine::translate((dest.x0, dest.y0))
            * vello_cpu::kurbo::Affine::scale_non_uniform(sx, sy);
        self.ctx.set_transform(tr);
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(paint);
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(image.width),
            f64::from(image.height),
        ));
    }

    fn set_font(&mut self, font: &FontDescriptor) -> VersecastResult<()> {
        if !font.size_px.is_finite() || font.size_px <= 0.0 {
            return Err(VersecastError::validation(
                "font size must be finite and > 0",
            ));
        }
        let face = self
            .find_face(font)
            .ok_or_else(|| VersecastError::render(format!("font {font} is not available")))?;
        self.active = Some(ActiveFont {
            face,
            size_px: font.size_px as f32,
        });
        Ok(())
    }

    fn measure_text(&mut self, text: &str) -> f64 {
        match self.layout(text, TextBrush::default()) {
            Some((layout, _)) => f64::from(layout.width()),
            None => 0.0,
        }
    }

    fn draw_text_centered(&mut self, text: &str, x: f64, y: f64, color: Rgba8) {
        let brush = TextBrush {
            r: color.r,
            g: color.g,
            b: color.b,
            a: color.a,
        };
        let Some((layout, face)) = self.layout(text, brush) else {
            return;
        };
        let left = x - f64::from(layout.width()) / 2.0;
        let top = y - f64::from(layout.height()) / 2.0;
        self.ctx
            .set_transform(vello_cpu::kurbo::Affine::translate((left, top)));
        self.ctx
            .set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        let font = self.faces[face].data.clone();
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                self.ctx
                    .glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }

    fn snapshot(&mut self) -> VersecastResult<FrameRGBA> {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        Ok(FrameRGBA {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn surface_dims(width: u32, height: u32) -> VersecastResult<(u16, u16)> {
    if width == 0 || height == 0 {
        return Err(VersecastError::validation(
            "surface width/height must be non-zero",
        ));
    }
    let w: u16 = width
        .try_into()
        .map_err(|_| VersecastError::validation("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| VersecastError::validation("surface height exceeds u16"))?;
    Ok((w, h))
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> VersecastResult<vello_cpu::Pixmap> {
    let (w, h) = surface_dims(width, height)?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(VersecastError::render("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
