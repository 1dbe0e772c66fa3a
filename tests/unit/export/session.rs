use super::*;
use crate::encode::sink::InMemorySink;

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 1,
        height: 1,
        fps: Fps::new(30, 1).unwrap(),
        bits_per_second: 1_000_000,
        codec: CodecHint::Vp9Webm,
        alpha: false,
    }
}

fn frame(v: u8) -> FrameRGBA {
    FrameRGBA {
        width: 1,
        height: 1,
        data: vec![v; 4],
        premultiplied: true,
    }
}

#[test]
fn captures_grid_slots_up_to_time() {
    let sink = InMemorySink::new();
    let probe = sink.probe();
    let mut s = CaptureSession::begin(Box::new(sink), cfg(), 1.0).unwrap();

    assert!(s.is_due(0.0));
    s.capture_through(0.0, &frame(1)).unwrap();
    assert_eq!(s.frames_captured(), 1);
    assert!(!s.is_due(0.01));

    // A late tick fills every slot it skipped with the current frame.
    s.capture_through(0.1, &frame(2)).unwrap();
    assert_eq!(s.frames_captured(), 4);

    s.capture_through(5.0, &frame(3)).unwrap();
    assert_eq!(s.frames_captured(), 30);

    let p = probe.lock().unwrap();
    let idx: Vec<u64> = p.frames.iter().map(|(i, _)| i.0).collect();
    assert_eq!(idx, (0..30).collect::<Vec<_>>());
    assert_eq!(p.frames[0].1, frame(1).digest());
    assert_eq!(p.frames[3].1, frame(2).digest());
}

#[test]
fn capture_remaining_stops_before_end() {
    let sink = InMemorySink::new();
    let mut s = CaptureSession::begin(Box::new(sink), cfg(), 8.5).unwrap();
    s.capture_through(8.0, &frame(0)).unwrap();
    assert_eq!(s.frames_captured(), 241);
    s.capture_remaining(&frame(0)).unwrap();
    assert_eq!(s.frames_captured(), 255);
    s.capture_remaining(&frame(0)).unwrap();
    assert_eq!(s.frames_captured(), 255);
}

#[test]
fn finish_writes_artifact_when_out_dir_is_set() {
    let dir = tempfile::tempdir().unwrap();
    let sink = InMemorySink::new();
    let probe = sink.probe();
    let s = CaptureSession::begin(Box::new(sink), cfg(), 1.0).unwrap();
    let req = ExportRequest {
        filename: "ignored here".to_owned(),
        out_dir: Some(dir.path().join("nested")),
        codec: CodecHint::Vp9Webm,
    };
    let art = s.finish("clip", &req).unwrap();
    assert_eq!(art.file_name, "clip.webm");
    assert_eq!(art.bits_per_second, 1_000_000);
    let path = art.path.unwrap();
    assert!(path.exists());
    assert_eq!(path, dir.path().join("nested").join("clip.webm"));
    assert_eq!(probe.lock().unwrap().end_calls, 1);
}

#[test]
fn finish_without_out_dir_stays_in_memory() {
    let s = CaptureSession::begin(Box::new(InMemorySink::new()), cfg(), 1.0).unwrap();
    let art = s
        .finish(
            "x",
            &ExportRequest {
                codec: CodecHint::H264Mp4,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(art.file_name, "x.mp4");
    assert!(art.path.is_none());
    assert_eq!(art.frames, 0);
}
