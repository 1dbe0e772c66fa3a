use super::*;

#[test]
fn flatten_premul_alpha_0_returns_bg() {
    let src = vec![0u8, 0, 0, 0];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 255]);
}

#[test]
fn flatten_premul_alpha_255_is_identity() {
    let src = vec![1u8, 2, 3, 255];
    let mut dst = vec![0u8; 4];
    flatten_premul_over_bg_to_opaque_rgba8(&mut dst, &src, [10, 20, 30, 255]).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn unpremultiply_restores_straight_color() {
    let src = vec![50u8, 25, 100, 128, 0, 0, 0, 0];
    let mut dst = vec![0u8; 8];
    unpremultiply_to_straight_rgba8(&mut dst, &src).unwrap();
    assert_eq!(&dst[..4], &[100, 50, 199, 128]);
    assert_eq!(&dst[4..], &[0, 0, 0, 0]);
    assert!(unpremultiply_to_straight_rgba8(&mut dst, &src[..4]).is_err());
}

#[test]
fn scratch_file_paths_are_unique_and_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let a = ScratchFile::new(dir.path(), "webm");
    let b = ScratchFile::new(dir.path(), "webm");
    assert_ne!(a.path(), b.path());
    std::fs::write(a.path(), b"x").unwrap();
    let p = a.path().to_path_buf();
    drop(a);
    assert!(!p.exists());
}

#[test]
fn sink_rejects_odd_dimensions_before_spawning() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::default());
    let err = sink
        .begin(SinkConfig {
            width: 3,
            height: 2,
            fps: Fps::new(30, 1).unwrap(),
            bits_per_second: 1_000_000,
            codec: CodecHint::Vp9Webm,
            alpha: false,
        })
        .unwrap_err();
    assert!(err.to_string().starts_with("validation error:"));
}

fn has_encoder(name: &str) -> bool {
    std::process::Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).contains(name))
        .unwrap_or(false)
}

#[test]
fn encodes_short_webm_when_ffmpeg_is_available() {
    if !is_ffmpeg_on_path() || !has_encoder("libvpx-vp9") {
        eprintln!("skipping: ffmpeg with libvpx-vp9 not available");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        scratch_dir: dir.path().to_path_buf(),
        bg_rgba: [0, 0, 0, 255],
    });
    sink.begin(SinkConfig {
        width: 16,
        height: 16,
        fps: Fps::new(30, 1).unwrap(),
        bits_per_second: 1_000_000,
        codec: CodecHint::Vp9Webm,
        alpha: false,
    })
    .unwrap();
    for i in 0..5u64 {
        let frame = FrameRGBA {
            width: 16,
            height: 16,
            data: vec![(i * 40) as u8; 16 * 16 * 4],
            premultiplied: true,
        };
        sink.push_frame(FrameIndex(i), &frame).unwrap();
    }
    let bytes = sink.end().unwrap();
    // EBML magic.
    assert_eq!(&bytes[..4], &[0x1A, 0x45, 0xDF, 0xA3]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
