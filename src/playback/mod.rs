//! Time-driven playback, export capture and narration coupling.

pub mod clock;
pub mod narration;
pub mod player;

pub use clock::{ManualClock, MonotonicClock, SystemClock};
pub use narration::{AudioOutput, FfplayOutput, Narrator};
pub use player::{PlaybackClock, PlaybackState, SETTLE_MS};
