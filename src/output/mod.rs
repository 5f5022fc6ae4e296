// Output formatting — terminal display for training reports and predictions.

pub mod terminal;

/// Shorten `text` to its first `max_chars` chars, marking the cut with "...".
/// Cuts on a char boundary, so multi-byte letters never split.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
