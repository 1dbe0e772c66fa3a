//! Versecast turns multi-line text into timed scenes, renders them onto a raster surface and
//! exports the result as video, optionally narrating each line with a speech provider.
//!
//! The pieces compose as follows:
//!
//! - Build a [`Timeline`] from text
//! - Render frames with a [`Compositor`] onto a [`Surface`] (usually [`CpuSurface`])
//! - Drive time with a [`PlaybackClock`]; arm an export into a [`FrameSink`] such as
//!   [`FfmpegSink`]
//! - Narrate through a [`VoiceService`]
#![forbid(unsafe_code)]

mod foundation;

/// Render configuration snapshots.
pub mod config;
/// Frame sinks.
pub mod encode;
/// Export policy and capture sessions.
pub mod export;
pub mod layout;
/// Playback scheduling and narration coupling.
pub mod playback;
/// Drawing surfaces and the frame compositor.
pub mod render;
pub mod timeline;
pub mod voice;

pub use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, Point, Rect, Rgba8};
pub use crate::foundation::error::{VersecastError, VersecastResult};

pub use crate::config::{
    AspectRatio, BackgroundMode, ExportQuality, FontStyle, FontWeight, ImageAsset,
    NarrationConfig, RenderConfig, TimingConfig,
};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{CodecHint, FrameSink, InMemorySink, SinkConfig};
pub use crate::export::{ExportArtifact, ExportRequest, ExportStart};
pub use crate::playback::{ManualClock, MonotonicClock, PlaybackClock, PlaybackState, SystemClock};
pub use crate::render::{Compositor, CpuSurface, FrameRGBA, RecordingSurface, Surface};
pub use crate::timeline::{Segment, Timeline};
pub use crate::voice::{ProviderId, VoiceService, VoiceServiceOpts};
