/*!
# Source position types (ScriptPosition, ScriptExtent)

Location types shared by the syntax tree, the diagnostics and the
reporters. Lines and columns are 1-based; columns count characters.
*/

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Position in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPosition {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl ScriptPosition {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Position of the first character of a text
    pub fn start() -> Self {
        Self::new(1, 1, 0)
    }
}

impl fmt::Display for ScriptPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Region of a script together with the text it covers.
///
/// `end_column` points one past the last character, the same way editors
/// report a selection end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptExtent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    #[serde(default)]
    pub start_offset: usize,
    #[serde(default)]
    pub end_offset: usize,
    #[serde(default)]
    pub text: String,
}

impl ScriptExtent {
    pub fn new(start: ScriptPosition, end: ScriptPosition, text: impl Into<String>) -> Self {
        Self {
            file: None,
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
            start_offset: start.offset,
            end_offset: end.offset,
            text: text.into(),
        }
    }

    pub fn with_file(mut self, file: Option<String>) -> Self {
        self.file = file;
        self
    }

    /// Empty extent at the beginning of a script
    pub fn empty() -> Self {
        Self::new(ScriptPosition::start(), ScriptPosition::start(), String::new())
    }

    pub fn start_position(&self) -> ScriptPosition {
        ScriptPosition::new(self.start_line, self.start_column, self.start_offset)
    }

    pub fn end_position(&self) -> ScriptPosition {
        ScriptPosition::new(self.end_line, self.end_column, self.end_offset)
    }
}

impl fmt::Display for ScriptExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:", file)?;
        }
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_column, self.end_line, self.end_column
        )
    }
}

/// Line index for fast offset->(line,column) mapping.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets where each line starts.
    line_starts: Arc<Vec<usize>>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = Vec::with_capacity(text.len() / 32 + 1);
        starts.push(0);
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { line_starts: Arc::new(starts) }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Maps a byte offset of `text` to a 1-based position.
    pub fn position(&self, text: &str, offset: usize) -> ScriptPosition {
        let offset = offset.min(text.len());
        // last line start <= offset
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line_start = self.line_starts[line];
        let column = text
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - line_start);
        ScriptPosition::new(line + 1, column + 1, offset)
    }

    /// Builds the extent covering `text[start..end]`.
    pub fn extent(&self, text: &str, start: usize, end: usize) -> ScriptExtent {
        let start_pos = self.position(text, start);
        let end_pos = self.position(text, end);
        let slice = text.get(start..end).unwrap_or_default();
        ScriptExtent::new(start_pos, end_pos, slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_basic() {
        let text = "line1\nline2\nlast";
        let idx = LineIndex::new(text);
        assert_eq!(idx.line_count(), 3);
        let p = idx.position(text, 7); // 'i' in line2
        assert_eq!(p.line, 2);
        assert_eq!(p.column, 2);
    }

    #[test]
    fn test_columns_count_characters() {
        let text = "$имя = 1\n$x";
        let idx = LineIndex::new(text);
        let eq = text.find('=').unwrap();
        let p = idx.position(text, eq);
        assert_eq!(p.line, 1);
        assert_eq!(p.column, 6);
    }

    #[test]
    fn test_extent_covers_slice() {
        let text = "ab\ncd";
        let idx = LineIndex::new(text);
        let extent = idx.extent(text, 3, 5);
        assert_eq!(extent.text, "cd");
        assert_eq!(extent.start_line, 2);
        assert_eq!(extent.start_column, 1);
        assert_eq!(extent.end_column, 3);
    }
}
