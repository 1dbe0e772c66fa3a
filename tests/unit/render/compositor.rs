use super::*;
use crate::config::{ExportQuality, ImageAsset};
use crate::foundation::core::Rgba8;
use crate::render::recording::{DrawOp, RecordingSurface};

fn sample() -> Timeline {
    Timeline::build("Hello world\n_\nGenerated in the browser", 2.0, 0.1)
}

fn tiny_png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([200, 10, 10, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn frame_sizes_follow_aspect() {
    assert_eq!(
        frame_size(AspectRatio::Landscape),
        Canvas {
            width: 1920,
            height: 1080
        }
    );
    assert_eq!(
        frame_size(AspectRatio::Portrait),
        Canvas {
            width: 1080,
            height: 1920
        }
    );
    assert_eq!(
        frame_size(AspectRatio::Square),
        Canvas {
            width: 1080,
            height: 1080
        }
    );
}

#[test]
fn cover_rect_fills_and_centers() {
    let canvas = Canvas {
        width: 1920,
        height: 1080,
    };
    // Square image: scale by width, overflow vertically.
    let r = cover_rect(canvas, 100, 100);
    assert!((r.width() - 1920.0).abs() < 1e-6);
    assert!((r.height() - 1920.0).abs() < 1e-6);
    assert!(r.x0.abs() < 1e-6);
    assert!((r.y0 + 420.0).abs() < 1e-6);

    // Tall canvas, wide image: scale by height.
    let r = cover_rect(
        Canvas {
            width: 1080,
            height: 1920,
        },
        400,
        200,
    );
    assert!((r.height() - 1920.0).abs() < 1e-6);
    assert!((r.width() - 3840.0).abs() < 1e-6);
    assert!((r.x0 + 1380.0).abs() < 1e-6);
}

#[test]
fn solid_background_then_centered_text() {
    let mut surface = RecordingSurface::new(10, 10);
    let log = surface.log();
    let cfg = RenderConfig::default();
    Compositor::new().render(&mut surface, 0.5, &sample(), &cfg);

    let ops = log.ops();
    assert_eq!(
        ops[0],
        DrawOp::Resize {
            width: 1920,
            height: 1080
        }
    );
    assert_eq!(ops[1], DrawOp::Clear);
    assert_eq!(
        ops[2],
        DrawOp::FillRect {
            rect: Rect::new(0.0, 0.0, 1920.0, 1080.0),
            color: Rgba8::rgb(0x11, 0x18, 0x27)
        }
    );
    assert_eq!(ops[3], DrawOp::SetFont("normal bold 60px \"Arial\"".to_owned()));
    assert_eq!(
        ops[4],
        DrawOp::Text {
            text: "Hello world".to_owned(),
            x: 960.0,
            y: 540.0,
            color: Rgba8::rgb(255, 255, 255)
        }
    );
    assert_eq!(ops.len(), 5);
}

#[test]
fn pause_and_past_end_draw_background_only() {
    let tl = sample();
    let cfg = RenderConfig::default();
    let mut comp = Compositor::new();
    let mut surface = RecordingSurface::new(1920, 1080);
    let log = surface.log();

    comp.render(&mut surface, 3.5, &tl, &cfg);
    assert!(log.last_texts().is_empty());
    assert_eq!(log.last_frame().len(), 1);

    comp.render(&mut surface, tl.total_duration(), &tl, &cfg);
    assert!(log.last_texts().is_empty());

    comp.render(&mut surface, 0.0, &Timeline::default(), &cfg);
    assert!(log.last_texts().is_empty());
}

#[test]
fn transparent_mode_paints_nothing_behind_text() {
    let cfg = RenderConfig::default().with_background_mode(BackgroundMode::Transparent);
    let mut surface = RecordingSurface::new(1920, 1080);
    let log = surface.log();
    Compositor::new().render(&mut surface, 0.0, &sample(), &cfg);
    assert!(
        log.last_frame()
            .iter()
            .all(|op| !matches!(op, DrawOp::FillRect { .. } | DrawOp::Image { .. }))
    );
    assert_eq!(log.last_texts(), vec!["Hello world"]);
}

#[test]
fn long_text_wraps_and_stays_centered_on_anchor() {
    // 60px font, 30px per char in the recording surface, 1820px max width: 60 chars per line.
    let text = "word ".repeat(40);
    let tl = Timeline::build(&text, 2.0, 0.1);
    let cfg = RenderConfig::default().with_text_y(25.0);
    let mut surface = RecordingSurface::new(1920, 1080);
    let log = surface.log();
    Compositor::new().render(&mut surface, 0.0, &tl, &cfg);

    let ys: Vec<f64> = log
        .last_frame()
        .into_iter()
        .filter_map(|op| match op {
            DrawOp::Text { y, .. } => Some(y),
            _ => None,
        })
        .collect();
    assert_eq!(ys.len(), 4);
    let lh = 90.0;
    let center = (ys[0] - lh / 2.0 + ys[ys.len() - 1] + lh / 2.0) / 2.0;
    assert!((center - 270.0).abs() < 1e-9);
    for line in log.last_texts() {
        assert!(line.chars().count() * 30 <= 1820);
    }
}

#[test]
fn missing_font_omits_text_but_keeps_background() {
    let mut surface = RecordingSurface::new(1920, 1080).without_fonts();
    let log = surface.log();
    let mut comp = Compositor::new();
    let cfg = RenderConfig::default();
    comp.render(&mut surface, 0.0, &sample(), &cfg);
    comp.render(&mut surface, 0.0, &sample(), &cfg);
    assert_eq!(log.frames_rendered(), 2);
    assert!(log.last_texts().is_empty());
    assert!(matches!(log.last_frame()[0], DrawOp::FillRect { .. }));
    assert_eq!(comp.warned.len(), 1);
}

#[test]
fn image_background_is_cover_fitted_and_decoded_once() {
    let cfg = RenderConfig::default()
        .with_aspect_ratio(AspectRatio::Square)
        .with_background_image(ImageAsset::new(tiny_png(4, 2)));
    let mut surface = RecordingSurface::new(1080, 1080);
    let log = surface.log();
    let mut comp = Compositor::new();
    comp.render(&mut surface, 0.0, &sample(), &cfg);
    comp.render(&mut surface, 0.1, &sample(), &cfg);

    let DrawOp::Image { id, dest } = log.last_frame()[0].clone() else {
        panic!("expected image background");
    };
    assert_eq!(id, cfg.background_image.as_ref().unwrap().id());
    assert_eq!(dest, Rect::new(-540.0, 0.0, 1620.0, 1080.0));
    assert!(comp.decoded.is_some());
}

#[test]
fn undecodable_image_is_skipped() {
    let cfg = RenderConfig::default().with_background_image(ImageAsset::new(b"junk".to_vec()));
    let mut surface = RecordingSurface::new(1920, 1080);
    let log = surface.log();
    Compositor::new().render(&mut surface, 0.0, &sample(), &cfg);
    assert!(
        log.last_frame()
            .iter()
            .all(|op| !matches!(op, DrawOp::Image { .. }))
    );
    assert_eq!(log.last_texts(), vec!["Hello world"]);
}

#[test]
fn rendering_is_idempotent() {
    let tl = sample();
    let cfg = RenderConfig::default().with_export_quality(ExportQuality::High);
    let mut comp = Compositor::new();
    let mut surface = RecordingSurface::new(1920, 1080);
    let log = surface.log();

    comp.render(&mut surface, 5.0, &tl, &cfg);
    let a = log.last_frame();
    let fa = surface.snapshot().unwrap();
    comp.render(&mut surface, 5.0, &tl, &cfg);
    let b = log.last_frame();
    let fb = surface.snapshot().unwrap();
    assert_eq!(a, b);
    assert_eq!(fa.digest(), fb.digest());
}

#[test]
fn cpu_frames_are_byte_identical() {
    let mut surface = crate::render::CpuSurface::new(64, 64).unwrap();
    let tl = sample();
    let cfg = RenderConfig::default().with_background_color(Rgba8::rgb(1, 2, 3));
    let mut comp = Compositor::new();

    comp.render(&mut surface, 1.0, &tl, &cfg);
    let a = surface.snapshot().unwrap();
    comp.render(&mut surface, 1.0, &tl, &cfg);
    let b = surface.snapshot().unwrap();
    assert_eq!((a.width, a.height), (1920, 1080));
    assert_eq!(a.digest(), b.digest());
    assert_eq!(&a.data[..4], &[1, 2, 3, 255]);
}
