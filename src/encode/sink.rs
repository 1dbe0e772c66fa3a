use std::sync::{Arc, Mutex, MutexGuard};

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{VersecastError, VersecastResult};
use crate::render::FrameRGBA;

/// Container/codec pair requested from the encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecHint {
    /// VP9 in WebM.
    #[default]
    Vp9Webm,
    /// H.264 in MP4.
    H264Mp4,
}

impl CodecHint {
    /// File extension of the container, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vp9Webm => "webm",
            Self::H264Mp4 => "mp4",
        }
    }

    /// MIME type of the container.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Vp9Webm => "video/webm;codecs=vp9",
            Self::H264Mp4 => "video/mp4",
        }
    }
}

/// Configuration provided to a [`FrameSink`] when a capture session begins.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Capture frames-per-second.
    pub fps: Fps,
    /// Target video bitrate.
    pub bits_per_second: u64,
    /// Requested container/codec.
    pub codec: CodecHint,
    /// Keep the alpha channel instead of flattening it.
    pub alpha: bool,
}

/// Sink contract for consuming captured frames.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order between one
/// `begin` and one `end`.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> VersecastResult<()>;
    /// Push one frame in strictly increasing order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> VersecastResult<()>;
    /// Called once after the last frame is pushed. Returns the encoded artifact.
    fn end(&mut self) -> VersecastResult<Vec<u8>>;
}

/// What an [`InMemorySink`] has observed so far.
#[derive(Debug, Clone, Default)]
pub struct SinkProbe {
    /// Configuration captured in `begin`.
    pub config: Option<SinkConfig>,
    /// Pushed frame indices with their content digests.
    pub frames: Vec<(FrameIndex, u64)>,
    /// Number of `begin` calls.
    pub begin_calls: usize,
    /// Number of `end` calls.
    pub end_calls: usize,
}

/// In-memory sink for tests and dry runs.
///
/// Only frame digests are retained. The probe stays readable after the sink has been handed to a
/// player.
#[derive(Debug, Default)]
pub struct InMemorySink {
    probe: Arc<Mutex<SinkProbe>>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the recorded observations.
    pub fn probe(&self) -> Arc<Mutex<SinkProbe>> {
        Arc::clone(&self.probe)
    }

    fn lock(&self) -> MutexGuard<'_, SinkProbe> {
        self.probe
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> VersecastResult<()> {
        let mut p = self.lock();
        p.config = Some(cfg);
        p.frames.clear();
        p.begin_calls += 1;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> VersecastResult<()> {
        let mut p = self.lock();
        if p.config.is_none() {
            return Err(VersecastError::encoding("in-memory sink not started"));
        }
        if let Some((last, _)) = p.frames.last()
            && idx <= *last
        {
            return Err(VersecastError::encoding(
                "in-memory sink received out-of-order frame index",
            ));
        }
        p.frames.push((idx, frame.digest()));
        Ok(())
    }

    fn end(&mut self) -> VersecastResult<Vec<u8>> {
        self.lock().end_calls += 1;
        Ok(Vec::new())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
