//! Source positions and token ranges.
//!
//! A [`Position`] is carried on every token boundary and tracks four
//! coordinates at once: the 1-based line number, the UTF-16 code-unit offset
//! within that line, the absolute UTF-16 code-unit offset from the start of
//! the document, and a grapheme-aware column used only for diagnostics.
//! Power Query source is UTF-8 on disk but column offsets in tooling
//! (editors, LSPs) are conventionally UTF-16 code units, so the lexer is
//! expected to report both.

use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

/// A single point in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    /// 1-based line number.
    pub line_number: u32,
    /// UTF-16 code-unit offset from the start of `line_number`.
    pub line_code_unit: u32,
    /// UTF-16 code-unit offset from the start of the document.
    pub code_unit: u32,
    /// Grapheme-cluster column within the line (1-based). Diagnostics only.
    pub column: u32,
}

impl Position {
    pub const fn new(line_number: u32, line_code_unit: u32, code_unit: u32, column: u32) -> Self {
        Self {
            line_number,
            line_code_unit,
            code_unit,
            column,
        }
    }

    /// The zero position: start of an empty document.
    pub const fn start() -> Self {
        Self::new(0, 0, 0, 1)
    }
}

/// A half-open span over the token stream, attached to every completed node.
///
/// `token_index_end` and `position_end` are exclusive, matching the
/// convention used throughout the parser for ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenRange {
    pub token_index_start: u32,
    pub token_index_end: u32,
    pub position_start: Position,
    pub position_end: Position,
}

impl TokenRange {
    pub const fn new(
        token_index_start: u32,
        token_index_end: u32,
        position_start: Position,
        position_end: Position,
    ) -> Self {
        Self {
            token_index_start,
            token_index_end,
            position_start,
            position_end,
        }
    }

    /// The union of two ranges: widest token span, widest position span.
    ///
    /// Both ranges must come from the same token stream; the caller is
    /// responsible for passing them in document order (invariant #2 in the
    /// parser's testable properties: children's ranges are strictly
    /// increasing, so `self` always precedes `other`).
    pub fn merge(self, other: TokenRange) -> TokenRange {
        TokenRange {
            token_index_start: self.token_index_start.min(other.token_index_start),
            token_index_end: self.token_index_end.max(other.token_index_end),
            position_start: self.position_start.min(other.position_start),
            position_end: self.position_end.max(other.position_end),
        }
    }

    /// Whether `position` falls on this range (§6.3): neither strictly
    /// before `position_start` nor at-or-after `position_end`.
    pub fn is_in_inclusive_range(&self, position: Position) -> bool {
        !self.is_before(position) && !self.is_after(position)
    }

    fn is_before(&self, position: Position) -> bool {
        position.line_number < self.position_start.line_number
            || (position.line_number == self.position_start.line_number
                && position.line_code_unit < self.position_start.line_code_unit)
    }

    fn is_after(&self, position: Position) -> bool {
        position.line_number > self.position_end.line_number
            || (position.line_number == self.position_end.line_number
                && position.line_code_unit >= self.position_end.line_code_unit)
    }
}

/// Pre-computed index of line boundaries, used by lexers to translate a byte
/// or code-unit offset into a full [`Position`] (including the grapheme
/// column, which requires re-scanning the line's graphemes on demand).
#[derive(Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line. The first entry is always 0.
    line_starts: Vec<u32>,
    source: String,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self {
            line_starts,
            source: source.to_string(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Translate a byte offset into a full [`Position`].
    ///
    /// `line_code_unit` and `code_unit` are reported in UTF-16 code units
    /// (as PQ tooling expects); `column` is the 1-based grapheme-cluster
    /// column within the line.
    pub fn position_at(&self, byte_offset: u32) -> Position {
        let line_idx = self
            .line_starts
            .partition_point(|&start| start <= byte_offset)
            .saturating_sub(1);
        let line_number = (line_idx + 1) as u32;
        let line_start = self.line_starts[line_idx];
        let line_start_us = line_start as usize;
        let offset_us = byte_offset as usize;

        let prefix_on_line = &self.source[line_start_us..offset_us];
        let line_code_unit = prefix_on_line.encode_utf16().count() as u32;
        let code_unit = self.source[..offset_us].encode_utf16().count() as u32;
        let column = prefix_on_line.graphemes(true).count() as u32 + 1;

        Position::new(line_number, line_code_unit, code_unit, column)
    }
}
