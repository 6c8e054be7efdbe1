//! Column arithmetic between tsserver byte columns and character indices.
//!
//! Diagnostics report a 1-based column measured over the UTF-8 encoding of the
//! line, while edits address characters. Every conversion here is total: out of
//! range input clamps to the line boundaries instead of failing.

/// Convert a 1-based byte column into a 0-based character index.
///
/// The result is the number of characters in the byte prefix that precedes the
/// column. A character cut in half by the prefix counts as one, which matches
/// lossy decoding of a truncated buffer. Columns past the end of the line clamp
/// to the line's character count.
pub fn char_index_for_byte_offset(line: &str, offset: usize) -> usize {
    let byte = offset.saturating_sub(1).min(line.len());
    line.char_indices().take_while(|(start, _)| *start < byte).count()
}

/// Convert a 0-based character index into a 1-based byte column.
///
/// Indices past the end clamp to one past the last byte.
pub fn byte_offset_for_char_index(line: &str, index: usize) -> usize {
    let byte = line
        .char_indices()
        .nth(index)
        .map_or(line.len(), |(start, _)| start);
    byte + 1
}

/// Byte position of a 0-based character index, clamped to the line length.
pub fn byte_index_for_char_index(line: &str, index: usize) -> usize {
    byte_offset_for_char_index(line, index) - 1
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Character span `[start, end)` of the identifier that touches `index`.
///
/// Returns `None` when the character at `index` is not part of a word.
pub fn word_range_at(line: &str, index: usize) -> Option<(usize, usize)> {
    let chars: Vec<char> = line.chars().collect();
    if !chars.get(index).copied().is_some_and(is_word_char) {
        return None;
    }

    let mut start = index;
    while start > 0 && is_word_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = index + 1;
    while end < chars.len() && is_word_char(chars[end]) {
        end += 1;
    }
    Some((start, end))
}

/// Slice a line by character indices, clamping both ends.
pub fn char_slice(line: &str, start: usize, end: usize) -> &str {
    let from = byte_index_for_char_index(line, start);
    let to = byte_index_for_char_index(line, end.max(start));
    &line[from..to]
}
