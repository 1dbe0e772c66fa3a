use crate::config::{AspectRatio, ExportQuality};

/// Fixed capture rate of every export.
pub const CAPTURE_FPS: u32 = 30;

/// Target bitrate for a quality tier. Square frames get 60 % of the tier's rate.
pub fn bitrate_for(quality: ExportQuality, aspect: AspectRatio) -> u64 {
    let base: u64 = match quality {
        ExportQuality::High => 5_000_000,
        ExportQuality::Medium => 2_500_000,
        ExportQuality::Low => 1_000_000,
    };
    match aspect {
        AspectRatio::Square => base * 3 / 5,
        AspectRatio::Landscape | AspectRatio::Portrait => base,
    }
}

/// Restrict `name` to ASCII letters, digits, `_` and `-`; empty names get a default per aspect.
pub fn sanitize_filename(name: &str, aspect: AspectRatio) -> String {
    let name = name.trim();
    let name = if name.is_empty() {
        format!("lyric_video_{}", aspect.slug())
    } else {
        name.to_owned()
    };
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Approximate size of an export in bytes.
pub fn estimate_export_bytes(total_duration: f64, quality: ExportQuality, aspect: AspectRatio) -> u64 {
    let bps = bitrate_for(quality, aspect) as f64;
    (total_duration.max(0.0) * bps / 8.0).round() as u64
}
