//! Greedy word wrapping and vertical block centering.
//!
//! Width measurement is injected so the same algorithm runs against real font metrics or a
//! monospace stand-in in tests.

/// Wrap `text` into lines no wider than `max_width` according to `measure`.
///
/// Words are separated by whitespace. A single word wider than `max_width` gets a line of its own
/// rather than being split. The last line is always emitted, so empty input yields `[""]`.
pub fn wrap_text(mut measure: impl FnMut(&str) -> f64, text: &str, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure(&candidate) > max_width {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    lines.push(current);
    lines
}

/// Baselines for `n` lines of height `line_height` whose block is centered on `center_y`.
pub fn line_baselines(n: usize, line_height: f64, center_y: f64) -> Vec<f64> {
    let block = n as f64 * line_height;
    let first = center_y - block / 2.0 + line_height / 2.0;
    (0..n).map(|i| first + i as f64 * line_height).collect()
}

#[cfg(test)]
#[path = "../tests/unit/layout.rs"]
mod tests;
