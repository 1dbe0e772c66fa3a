//! Encoding sinks.
//!
//! Sinks consume captured frames in increasing index order and finalize into one byte blob.

/// `ffmpeg`-based sink (WebM/VP9 or MP4/H.264 via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
