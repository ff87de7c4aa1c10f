//! Shared helpers

pub mod persistence;

pub use persistence::{JsonStore, StorageKey, write_json_atomic};

/// Keep the first `max_chars` characters of `text`, never splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// The last `max_chars` characters of `text`
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    match text.char_indices().nth(total - max_chars) {
        Some((byte_index, _)) => &text[byte_index..],
        None => text,
    }
}
