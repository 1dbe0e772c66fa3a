use std::sync::Arc;

use crate::config::{BackgroundMode, RenderConfig};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::export::{
    CAPTURE_FPS, CaptureSession, ExportArtifact, ExportRequest, ExportStart, bitrate_for,
    sanitize_filename,
};
use crate::foundation::core::Fps;
use crate::foundation::error::{VersecastError, VersecastResult};
use crate::playback::clock::MonotonicClock;
use crate::playback::narration::Narrator;
use crate::render::{Compositor, Surface, frame_size};
use crate::timeline::Timeline;

/// Delay between arming an export and starting playback.
pub const SETTLE_MS: f64 = 100.0;

/// Observable playback state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaybackState {
    /// Seconds into the timeline.
    pub current_time: f64,
    pub is_playing: bool,
    pub is_recording: bool,
}

struct Recording {
    session: CaptureSession,
    request: ExportRequest,
    file_stem: String,
}

/// Cooperative player advanced by the host calling [`PlaybackClock::tick`] once per frame.
///
/// Owns the drawing surface, so rendering and export capture always see the same pixels. While
/// stopped, every change to time, timeline or config re-renders exactly once.
pub struct PlaybackClock {
    surface: Box<dyn Surface>,
    clock: Arc<dyn MonotonicClock>,
    compositor: Compositor,
    timeline: Timeline,
    config: RenderConfig,
    state: PlaybackState,
    clock_start: Option<f64>,
    pending_start: Option<f64>,
    recording: Option<Recording>,
    last_export: Option<VersecastResult<ExportArtifact>>,
    narrator: Option<Narrator>,
}

impl PlaybackClock {
    /// Create a stopped player at time zero and render the initial frame.
    pub fn new(surface: Box<dyn Surface>, clock: Arc<dyn MonotonicClock>) -> Self {
        let mut player = Self {
            surface,
            clock,
            compositor: Compositor::new(),
            timeline: Timeline::default(),
            config: RenderConfig::default(),
            state: PlaybackState::default(),
            clock_start: None,
            pending_start: None,
            recording: None,
            last_export: None,
            narrator: None,
        };
        player.render();
        player
    }

    /// Attach narration. Segments are spoken while playing when the config enables it.
    pub fn with_narrator(mut self, narrator: Narrator) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// `true` while playing or waiting for a delayed start.
    pub fn is_active(&self) -> bool {
        self.state.is_playing || self.pending_start.is_some()
    }

    /// Fraction of the timeline played, in `[0, 1]`. Zero for an empty timeline.
    pub fn progress(&self) -> f64 {
        let total = self.timeline.total_duration();
        if total <= 0.0 {
            0.0
        } else {
            (self.state.current_time / total).clamp(0.0, 1.0)
        }
    }

    /// Start or resume. Rewinds first when parked at the end.
    pub fn play(&mut self) {
        if self.state.is_playing {
            return;
        }
        self.pending_start = None;
        if self.state.current_time >= self.timeline.total_duration() {
            self.state.current_time = 0.0;
        }
        self.clock_start = Some(self.clock.now_ms() - self.state.current_time * 1000.0);
        self.state.is_playing = true;
        tracing::debug!(from = self.state.current_time, "play");
    }

    /// Freeze at the current time and redraw it.
    pub fn pause(&mut self) {
        self.halt();
        tracing::debug!(at = self.state.current_time, "pause");
        self.render();
    }

    pub fn toggle(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Stop and rewind to zero. An active recording is finalized with the frames captured so far.
    pub fn reset(&mut self) {
        self.halt();
        self.state.current_time = 0.0;
        self.render();
        self.finish_recording();
    }

    /// Jump to `time`, clamped to the timeline. Playback continues from there if running.
    pub fn seek(&mut self, time: f64) {
        let time = time.clamp(0.0, self.timeline.total_duration());
        self.state.current_time = time;
        if self.state.is_playing {
            self.clock_start = Some(self.clock.now_ms() - time * 1000.0);
        } else {
            self.render();
        }
    }

    pub fn set_timeline(&mut self, timeline: Timeline) {
        self.timeline = timeline;
        if !self.state.is_playing {
            self.render();
        }
    }

    pub fn set_config(&mut self, config: RenderConfig) {
        self.config = config;
        if !self.state.is_playing {
            self.render();
        }
    }

    /// Advance to the clock's current time. Never fails; problems are logged or recorded as the
    /// export outcome.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        if let Some(at) = self.pending_start
            && now >= at
        {
            self.play();
        }
        if !self.state.is_playing {
            return;
        }
        let Some(start) = self.clock_start else {
            return;
        };

        let elapsed = (now - start) / 1000.0;
        let total = self.timeline.total_duration();
        if elapsed >= total {
            self.capture_remaining();
            self.state.current_time = total;
            self.halt();
            self.render();
            self.finish_recording();
            return;
        }

        self.state.current_time = elapsed;
        self.render();
        self.capture_due();
        self.narrate();
    }

    /// Arm an export of the whole timeline into `sink`. Playback starts after [`SETTLE_MS`].
    #[tracing::instrument(level = "info", skip(self, sink), fields(file = %request.filename))]
    pub fn start_export(
        &mut self,
        request: ExportRequest,
        sink: Box<dyn FrameSink>,
    ) -> VersecastResult<ExportStart> {
        if self.state.is_recording {
            return Ok(ExportStart::Busy);
        }
        if self.timeline.is_empty() {
            return Ok(ExportStart::EmptyTimeline);
        }

        self.halt();
        self.state.current_time = 0.0;
        self.render();

        let canvas = frame_size(self.config.aspect_ratio);
        let sink_config = SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: Fps::new(CAPTURE_FPS, 1)?,
            bits_per_second: bitrate_for(self.config.export_quality, self.config.aspect_ratio),
            codec: request.codec,
            alpha: self.config.background_mode == BackgroundMode::Transparent,
        };
        let session = CaptureSession::begin(sink, sink_config, self.timeline.total_duration())?;
        let file_stem = sanitize_filename(&request.filename, self.config.aspect_ratio);
        tracing::info!(
            stem = %file_stem,
            bps = session.config().bits_per_second,
            total = self.timeline.total_duration(),
            "export armed"
        );

        self.recording = Some(Recording {
            session,
            request,
            file_stem,
        });
        self.last_export = None;
        self.state.is_recording = true;
        self.pending_start = Some(self.clock.now_ms() + SETTLE_MS);
        Ok(ExportStart::Started)
    }

    /// Stop playback and finalize the active recording with the frames captured so far.
    pub fn stop_export(&mut self) {
        if self.recording.is_none() {
            return;
        }
        self.halt();
        self.render();
        self.finish_recording();
    }

    /// Collect the outcome of the last finished export, once.
    pub fn take_export_result(&mut self) -> Option<VersecastResult<ExportArtifact>> {
        self.last_export.take()
    }

    fn halt(&mut self) {
        self.state.is_playing = false;
        self.clock_start = None;
        self.pending_start = None;
        if let Some(narrator) = self.narrator.as_mut() {
            narrator.stop();
        }
    }

    fn render(&mut self) {
        self.compositor.render(
            self.surface.as_mut(),
            self.state.current_time,
            &self.timeline,
            &self.config,
        );
    }

    fn capture_due(&mut self) {
        let time = self.state.current_time;
        let Some(rec) = self.recording.as_mut() else {
            return;
        };
        if !rec.session.is_due(time) {
            return;
        }
        let result = self
            .surface
            .snapshot()
            .and_then(|frame| rec.session.capture_through(time, &frame));
        if let Err(e) = result {
            self.abort_recording(e);
        }
    }

    fn capture_remaining(&mut self) {
        let Some(rec) = self.recording.as_mut() else {
            return;
        };
        let result = self
            .surface
            .snapshot()
            .and_then(|frame| rec.session.capture_remaining(&frame));
        if let Err(e) = result {
            self.abort_recording(e);
        }
    }

    fn finish_recording(&mut self) {
        let Some(rec) = self.recording.take() else {
            return;
        };
        self.state.is_recording = false;
        let result = rec.session.finish(&rec.file_stem, &rec.request);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "export failed");
        }
        self.last_export = Some(result);
    }

    fn abort_recording(&mut self, error: VersecastError) {
        tracing::warn!(error = %error, "export aborted");
        self.recording = None;
        self.state.is_recording = false;
        self.last_export = Some(Err(error));
    }

    fn narrate(&mut self) {
        if !self.config.narration.enabled {
            return;
        }
        let Some(narrator) = self.narrator.as_mut() else {
            return;
        };
        let index = self.timeline.active_index(self.state.current_time);
        narrator.on_segment(index, &self.timeline, &self.config.narration);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/player.rs"]
mod tests;
