//! Text-to-timeline conversion.
//!
//! Every non-blank line of the input becomes one [`Segment`]. A line made of a single `_` is a
//! pause: it shows nothing for one second. Segments are contiguous on the time axis.

use crate::foundation::math::round2;

/// Marker line that produces a silent one-second pause.
pub const PAUSE_TOKEN: &str = "_";

/// Fixed duration of a pause segment, in seconds.
pub const PAUSE_DURATION_S: f64 = 1.0;

/// Shortest duration a text segment can get after rounding.
pub const MIN_SEGMENT_S: f64 = 0.01;

/// One timed unit of displayed text. Empty `text` denotes a pause.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    /// Trimmed line text (empty for pauses).
    pub text: String,
    /// Duration in seconds, always `> 0`.
    pub duration: f64,
}

impl Segment {
    /// `true` for pause segments.
    pub fn is_pause(&self) -> bool {
        self.text.is_empty()
    }
}

/// Ordered, contiguous sequence of segments.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    segments: Vec<Segment>,
    total: f64,
}

impl Timeline {
    /// Build a timeline from raw multi-line text.
    ///
    /// Total: empty or whitespace-only input yields an empty timeline. Each text line lasts
    /// `base_time + chars * char_multiplier` seconds rounded to two decimals, and never less than
    /// [`MIN_SEGMENT_S`].
    #[tracing::instrument(level = "debug", skip(text), fields(bytes = text.len()))]
    pub fn build(text: &str, base_time: f64, char_multiplier: f64) -> Self {
        let segments: Vec<Segment> = text
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                if line == PAUSE_TOKEN {
                    Segment {
                        text: String::new(),
                        duration: PAUSE_DURATION_S,
                    }
                } else {
                    let chars = line.chars().count() as f64;
                    Segment {
                        text: line.to_owned(),
                        duration: round2(base_time + chars * char_multiplier).max(MIN_SEGMENT_S),
                    }
                }
            })
            .collect();
        Self::from_segments(segments)
    }

    /// Wrap pre-built segments.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let total = segments.iter().fold(0.0, |acc, s| acc + s.duration);
        tracing::debug!(segments = segments.len(), total, "timeline built");
        Self { segments, total }
    }

    /// Borrow the segments in temporal order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// `true` when there is nothing to play.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of all segment durations.
    pub fn total_duration(&self) -> f64 {
        self.total
    }

    /// Index of the segment whose `[start, start + duration)` interval contains `t`.
    pub fn active_index(&self, t: f64) -> Option<usize> {
        let mut elapsed = 0.0;
        for (i, seg) in self.segments.iter().enumerate() {
            if t >= elapsed && t < elapsed + seg.duration {
                return Some(i);
            }
            elapsed += seg.duration;
        }
        None
    }

    /// Segment active at `t`, if any.
    pub fn active_segment(&self, t: f64) -> Option<&Segment> {
        self.active_index(t).map(|i| &self.segments[i])
    }

    /// Cumulative start offset of segment `i`.
    pub fn segment_start(&self, i: usize) -> Option<f64> {
        if i >= self.segments.len() {
            return None;
        }
        Some(
            self.segments[..i]
                .iter()
                .fold(0.0, |acc, s| acc + s.duration),
        )
    }
}

#[cfg(test)]
#[path = "../tests/unit/timeline.rs"]
mod tests;
