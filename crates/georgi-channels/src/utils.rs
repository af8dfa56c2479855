//! Helpers shared by channel implementations.

/// Split a long message into chunks of at most `max_chars` characters,
/// preferring to break after a newline.
pub fn split_message(text: &str, max_chars: usize) -> Vec<&str> {
    if text.chars().count() <= max_chars {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(i, _)| i);
        let break_at = if end < rest.len() {
            rest[..end].rfind('\n').map_or(end, |i| i + 1)
        } else {
            end
        };
        chunks.push(&rest[..break_at]);
        rest = &rest[break_at..];
    }

    chunks
}
