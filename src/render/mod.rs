//! Frame rendering.
//!
//! [`Compositor`] paints scenes onto any [`Surface`]. [`CpuSurface`] rasterizes with `vello_cpu`;
//! [`RecordingSurface`] only records calls.

mod compositor;
mod cpu;
mod decode;
mod recording;
mod surface;

pub use compositor::{Compositor, LINE_HEIGHT_FACTOR, TEXT_MARGIN_PX, cover_rect, frame_size};
pub use cpu::CpuSurface;
pub use decode::{decode_image, encode_png};
pub(crate) use decode::unpremultiply_rgba8_in_place;
pub use recording::{DrawOp, RecordingLog, RecordingSurface};
pub use surface::{FontDescriptor, FrameRGBA, RasterImage, Surface};
