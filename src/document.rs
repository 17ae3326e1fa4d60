//! Text document facade: offset/position mapping and line access.
//!
//! The rest of the crate works in byte offsets (`Span`); this module
//! converts them to editor-protocol positions. Lines are terminated by
//! `\n`, `\r` or `\r\n`, each counting as a single terminator that is not
//! part of the line's content. Character offsets are UTF-16 code units.

use crate::types::{Position, Range};

/// A half-open byte-offset range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// An empty span at `offset`.
    pub fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check whether the span covers no text.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// An in-memory text document with line-oriented access.
#[derive(Debug)]
pub struct TextDocument<'a> {
    content: &'a str,
    /// Byte offset of the first character of each line.
    line_starts: Vec<usize>,
}

impl<'a> TextDocument<'a> {
    /// Index the given source text.
    pub fn new(content: &'a str) -> Self {
        let mut line_starts = vec![0];
        let bytes = content.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    line_starts.push(i + 1);
                    i += 1;
                }
                b'\r' => {
                    if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                        line_starts.push(i + 2);
                        i += 2;
                    } else {
                        line_starts.push(i + 1);
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }
        Self {
            content,
            line_starts,
        }
    }

    /// The full source text.
    pub fn content(&self) -> &'a str {
        self.content
    }

    /// The number of lines in the document.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// The line number containing the given byte offset.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert) => insert - 1,
        }
    }

    /// Byte offset of the first character of `line`.
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts
            .get(line)
            .copied()
            .unwrap_or(self.content.len())
    }

    /// Byte offset just past the content of `line`, before its terminator.
    pub fn line_end(&self, line: usize) -> usize {
        let start = self.line_start(line);
        let limit = self.line_start(line + 1);
        let mut end = limit;
        let bytes = self.content.as_bytes();
        while end > start {
            let b = bytes[end - 1];
            if b == b'\n' || b == b'\r' {
                end -= 1;
            } else {
                break;
            }
        }
        end
    }

    /// The content of `line`, without its terminator.
    pub fn line_text(&self, line: usize) -> &'a str {
        &self.content[self.line_start(line)..self.line_end(line)]
    }

    /// Convert a byte offset to a position.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.content.len());
        let line = self.line_of(offset);
        let prefix = &self.content[self.line_start(line)..offset];
        Position::new(line as u32, utf16_len(prefix) as u32)
    }

    /// Convert a position to a byte offset.
    ///
    /// Character offsets past the end of the line clamp to the line end;
    /// lines past the end of the document clamp to the document end.
    pub fn offset_at(&self, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.line_starts.len() {
            return self.content.len();
        }
        let start = self.line_start(line);
        let end = self.line_end(line);
        let mut units = 0usize;
        for (i, ch) in self.content[start..end].char_indices() {
            if units >= position.character as usize {
                return start + i;
            }
            units += ch.len_utf16();
        }
        end
    }

    /// Convert a byte span to an editor range.
    pub fn range_of(&self, span: Span) -> Range {
        Range::new(self.position_at(span.start), self.position_at(span.end))
    }

    /// The source text covered by a span.
    pub fn text(&self, span: Span) -> &'a str {
        &self.content[span.start.min(self.content.len())..span.end.min(self.content.len())]
    }

    /// The source text covered by an editor range.
    pub fn slice(&self, range: Range) -> &'a str {
        let start = self.offset_at(range.start);
        let end = self.offset_at(range.end);
        &self.content[start.min(end)..end.max(start)]
    }
}

fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}
