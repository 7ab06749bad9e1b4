//! Length filter and whitespace cleanup applied to every candidate example.

/// Collapse every whitespace run (newlines, tabs, NBSP and other Unicode
/// spaces included) into one ASCII space and trim both ends.
/// The result never contains a line break, and `cleanup(cleanup(s)) == cleanup(s)`.
pub fn cleanup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Character (not byte) count strictly greater than `min_char_length`.
#[inline]
pub fn exceeds_min_length(s: &str, min_char_length: usize) -> bool {
    s.chars().nth(min_char_length).is_some()
}

/// Clean a candidate and keep it only if the cleaned text is long enough.
pub fn accept(candidate: &str, min_char_length: usize) -> Option<String> {
    let cleaned = cleanup(candidate);
    if exceeds_min_length(&cleaned, min_char_length) {
        Some(cleaned)
    } else {
        None
    }
}
