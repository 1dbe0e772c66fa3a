use super::*;

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::new(30, 1).unwrap(),
        bits_per_second: 2_500_000,
        codec: CodecHint::Vp9Webm,
        alpha: false,
    }
}

fn frame(v: u8) -> FrameRGBA {
    FrameRGBA {
        width: 2,
        height: 2,
        data: vec![v; 16],
        premultiplied: true,
    }
}

#[test]
fn in_memory_sink_records_digests_in_order() {
    let mut sink = InMemorySink::new();
    let probe = sink.probe();
    sink.begin(cfg()).unwrap();
    sink.push_frame(FrameIndex(0), &frame(1)).unwrap();
    sink.push_frame(FrameIndex(1), &frame(2)).unwrap();
    assert!(sink.push_frame(FrameIndex(1), &frame(3)).is_err());
    assert!(sink.end().unwrap().is_empty());

    let p = probe.lock().unwrap();
    assert_eq!(p.config.as_ref().unwrap().bits_per_second, 2_500_000);
    assert_eq!(p.frames.len(), 2);
    assert_eq!(p.frames[1], (FrameIndex(1), frame(2).digest()));
    assert_eq!((p.begin_calls, p.end_calls), (1, 1));
}

#[test]
fn push_before_begin_is_an_encoding_error() {
    let mut sink = InMemorySink::new();
    let err = sink.push_frame(FrameIndex(0), &frame(0)).unwrap_err();
    assert!(err.to_string().starts_with("encoding error:"));
}

#[test]
fn codec_hint_extensions() {
    assert_eq!(CodecHint::default().extension(), "webm");
    assert_eq!(CodecHint::H264Mp4.extension(), "mp4");
    assert!(CodecHint::Vp9Webm.mime().contains("vp9"));
}
