use crate::position::byte_index_for_char_index;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A 0-based line and character position inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.character + 1)
    }
}

/// Half-open range `[start, end)` in character coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range on a single line.
    pub const fn on_line(line: u32, start: u32, end: u32) -> Self {
        Self {
            start: Position::new(line, start),
            end: Position::new(line, end),
        }
    }

    /// Zero-width range at a position.
    pub const fn point(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether two ranges claim any common text.
    ///
    /// Two zero-width ranges at the same point also conflict, since their
    /// relative order in the output would be ambiguous.
    pub fn overlaps(&self, other: &Range) -> bool {
        if self.is_empty() && other.is_empty() {
            return self.start == other.start;
        }
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Replacement of a character range with new text.
///
/// Ranges are always expressed against the document as it was before any
/// edit of the same batch was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }

    /// Zero-width insertion.
    pub fn insert(position: Position, text: impl Into<String>) -> Self {
        Self::new(Range::point(position), text)
    }

    pub fn delete(range: Range) -> Self {
        Self::new(range, String::new())
    }

    /// Minimal edit turning `old` into `new` on line `line`.
    ///
    /// Strips the common prefix and suffix so the edit claims only the text
    /// that actually changes. Returns `None` when the lines are equal.
    pub fn between_lines(line: u32, old: &str, new: &str) -> Option<Self> {
        if old == new {
            return None;
        }
        let old_chars: Vec<char> = old.chars().collect();
        let new_chars: Vec<char> = new.chars().collect();

        let prefix = old_chars
            .iter()
            .zip(&new_chars)
            .take_while(|(a, b)| a == b)
            .count();
        let max_suffix = old_chars.len().min(new_chars.len()) - prefix;
        let suffix = old_chars
            .iter()
            .rev()
            .zip(new_chars.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();

        let replacement: String = new_chars[prefix..new_chars.len() - suffix].iter().collect();
        Some(Self::new(
            Range::on_line(
                line,
                prefix as u32,
                (old_chars.len() - suffix) as u32,
            ),
            replacement,
        ))
    }
}

impl fmt::Display for TextEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {:?}", self.range, self.new_text)
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Invalid range {range}: end precedes start")]
    InvertedRange { range: Range },

    #[error("Position {position} is outside the document ({lines} lines)")]
    InvalidPosition { position: Position, lines: usize },

    #[error("Edits overlap: {first} and {second}")]
    Overlap { first: Range, second: Range },

    #[error("Document changed since diagnostics were requested: {0}")]
    StaleSnapshot(PathBuf),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte offsets of each line start, used to map positions into a text.
struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { text, starts }
    }

    fn line(&self, line: usize) -> Option<&'a str> {
        let start = *self.starts.get(line)?;
        let end = self
            .starts
            .get(line + 1)
            .map_or(self.text.len(), |next| next - 1);
        let content = &self.text[start..end];
        Some(content.strip_suffix('\r').unwrap_or(content))
    }

    fn byte_offset(&self, position: Position) -> Result<usize, EditError> {
        let invalid = || EditError::InvalidPosition {
            position,
            lines: self.starts.len(),
        };
        let index = position.line as usize;
        let content = self.line(index).ok_or_else(invalid)?;
        let character = position.character as usize;
        if character > content.chars().count() {
            return Err(invalid());
        }
        Ok(self.starts[index] + byte_index_for_char_index(content, character))
    }
}

/// Line `line` (0-based) of `text`, without its terminator.
pub fn line_of(text: &str, line: usize) -> Option<&str> {
    LineIndex::new(text).line(line)
}

/// Apply a batch of edits to `text` in a single pass.
///
/// All ranges are resolved against the original text and checked for overlap
/// before any output is built. The result is then assembled front to back;
/// edits sharing a start position keep their batch order in the output.
pub fn apply_batch(text: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let index = LineIndex::new(text);

    let mut resolved = Vec::with_capacity(edits.len());
    for (order, edit) in edits.iter().enumerate() {
        if edit.range.end < edit.range.start {
            return Err(EditError::InvertedRange { range: edit.range });
        }
        let start = index.byte_offset(edit.range.start)?;
        let end = index.byte_offset(edit.range.end)?;
        resolved.push((start, end, order, edit));
    }

    for (i, (_, _, _, a)) in resolved.iter().enumerate() {
        for (_, _, _, b) in &resolved[i + 1..] {
            if a.range.overlaps(&b.range) {
                return Err(EditError::Overlap {
                    first: a.range,
                    second: b.range,
                });
            }
        }
    }

    resolved.sort_by_key(|&(start, _, order, _)| (start, order));

    // Non-overlapping, so `start < cursor` only for an insertion at the start
    // of a replacement that came earlier in the batch.
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end, _, edit) in resolved {
        if start > cursor {
            output.push_str(&text[cursor..start]);
        }
        output.push_str(&edit.new_text);
        cursor = cursor.max(end);
    }
    output.push_str(&text[cursor..]);
    Ok(output)
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the file is left untouched.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let parent = path.parent().ok_or_else(|| {
        EditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    // Watchers key off mtime; make sure it moves even on coarse filesystems.
    filetime::set_file_mtime(path, filetime::FileTime::now())?;

    Ok(())
}
