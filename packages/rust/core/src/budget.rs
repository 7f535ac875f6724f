//! Context length cap.

/// Default context cap in characters.
pub const MAX_CONTEXT_CHARS: usize = 49_000;

/// Cut `text` to at most `max_chars` characters (Unicode scalar values).
pub fn budget(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
