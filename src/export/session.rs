use std::path::PathBuf;

use anyhow::Context as _;

use crate::encode::sink::{CodecHint, FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{VersecastError, VersecastResult};
use crate::render::FrameRGBA;

// Absorbs wall-clock jitter when a tick lands exactly on a frame boundary.
const FRAME_SLOT_EPSILON: f64 = 1e-6;

/// What the caller asked to export.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportRequest {
    /// Requested base name. Sanitized before use; empty picks the default name.
    pub filename: String,
    /// Directory the artifact is written to. `None` keeps it in memory only.
    pub out_dir: Option<PathBuf>,
    /// Container/codec.
    pub codec: CodecHint,
}

/// Outcome of `start_export`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportStart {
    /// Capture is armed; playback begins after the settle delay.
    Started,
    /// A recording is already in progress. Nothing changed.
    Busy,
    /// There is nothing to record. Nothing changed.
    EmptyTimeline,
}

/// Finalized export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportArtifact {
    /// `<sanitized-name>.<ext>`.
    pub file_name: String,
    /// Where the artifact was written, if an output directory was requested.
    pub path: Option<PathBuf>,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// Frames handed to the encoder.
    pub frames: u64,
    /// Bitrate the encoder was configured with.
    pub bits_per_second: u64,
}

/// Live capture of surface output into a [`FrameSink`] at a fixed frame rate.
///
/// Frames are sampled on a fixed grid: frame `i` shows the surface as last rendered at or before
/// `i / fps`. Frames at or past the end of the timeline are never captured.
pub struct CaptureSession {
    sink: Box<dyn FrameSink>,
    fps: Fps,
    end_time: f64,
    next_frame: u64,
    config: SinkConfig,
}

impl CaptureSession {
    /// Begin the sink and open a session covering `[0, end_time)`.
    pub fn begin(
        mut sink: Box<dyn FrameSink>,
        config: SinkConfig,
        end_time: f64,
    ) -> VersecastResult<Self> {
        sink.begin(config.clone())?;
        Ok(Self {
            sink,
            fps: config.fps,
            end_time,
            next_frame: 0,
            config,
        })
    }

    /// Sink configuration in effect.
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Frames pushed so far.
    pub fn frames_captured(&self) -> u64 {
        self.next_frame
    }

    /// `true` when a frame is due at or before `time`.
    pub fn is_due(&self, time: f64) -> bool {
        self.next_frame < self.frame_limit(time)
    }

    /// Push `frame` for every grid slot at or before `time` not captured yet.
    pub fn capture_through(&mut self, time: f64, frame: &FrameRGBA) -> VersecastResult<()> {
        let limit = self.frame_limit(time);
        while self.next_frame < limit {
            self.sink.push_frame(FrameIndex(self.next_frame), frame)?;
            self.next_frame += 1;
        }
        Ok(())
    }

    /// Push `frame` for every remaining grid slot before the end of the session.
    pub fn capture_remaining(&mut self, frame: &FrameRGBA) -> VersecastResult<()> {
        let limit = self.fps.frames_before(self.end_time);
        while self.next_frame < limit {
            self.sink.push_frame(FrameIndex(self.next_frame), frame)?;
            self.next_frame += 1;
        }
        Ok(())
    }

    fn frame_limit(&self, time: f64) -> u64 {
        let slots = time * self.fps.as_f64() + FRAME_SLOT_EPSILON;
        let through = if slots < 0.0 {
            0
        } else {
            slots.floor() as u64 + 1
        };
        through.min(self.fps.frames_before(self.end_time))
    }

    /// Finalize the sink into an artifact, writing it to `out_dir` when requested.
    #[tracing::instrument(level = "info", skip(self, request), fields(frames = self.next_frame))]
    pub fn finish(mut self, file_stem: &str, request: &ExportRequest) -> VersecastResult<ExportArtifact> {
        let bytes = self.sink.end()?;
        let file_name = format!("{file_stem}.{}", request.codec.extension());
        let path = match &request.out_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("failed to create output directory '{}'", dir.display())
                })?;
                let path = dir.join(&file_name);
                std::fs::write(&path, &bytes)
                    .with_context(|| format!("failed to write '{}'", path.display()))
                    .map_err(|e| VersecastError::encoding(format!("{e:#}")))?;
                Some(path)
            }
            None => None,
        };
        tracing::info!(file = %file_name, bytes = bytes.len(), "export finalized");
        Ok(ExportArtifact {
            file_name,
            path,
            bytes,
            frames: self.next_frame,
            bits_per_second: self.config.bits_per_second,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/session.rs"]
mod tests;
