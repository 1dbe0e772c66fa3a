//! Export policy and capture sessions.
//!
//! The playback clock owns the live [`CaptureSession`]; this module decides bitrate and naming and
//! turns captured frames into an [`ExportArtifact`].

mod policy;
mod session;

pub use policy::{CAPTURE_FPS, bitrate_for, estimate_export_bytes, sanitize_filename};
pub use session::{CaptureSession, ExportArtifact, ExportRequest, ExportStart};
