//! Source span representation shared by the syntax tree and diagnostics

use serde::{Deserialize, Serialize};

/// Contiguous region of a C# source file
///
/// Byte offsets index into the unit's source text. Lines are 1-indexed,
/// columns are 0-indexed byte offsets within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Byte offset of the start of the span (inclusive)
    pub start: usize,
    /// Byte offset of the end of the span (exclusive)
    pub end: usize,
    /// Line number of the start (1-indexed)
    pub start_line: u32,
    /// Line number of the end (1-indexed)
    pub end_line: u32,
    /// Column of the start (0-indexed, in bytes)
    pub start_col: u32,
    /// Column of the end (0-indexed, in bytes)
    pub end_col: u32,
}

impl SourceSpan {
    pub fn new(
        start: usize,
        end: usize,
        start_line: u32,
        end_line: u32,
        start_col: u32,
        end_col: u32,
    ) -> Self {
        SourceSpan {
            start,
            end,
            start_line,
            end_line,
            start_col,
            end_col,
        }
    }

    /// Span of a tree-sitter node (tree-sitter rows are 0-indexed)
    pub fn from_node(node: tree_sitter::Node<'_>) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        SourceSpan {
            start: node.start_byte(),
            end: node.end_byte(),
            start_line: start.row as u32 + 1,
            end_line: end.row as u32 + 1,
            start_col: start.column as u32,
            end_col: end.column as u32,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Number of source lines touched by the span, inclusive of both ends
    pub fn line_count(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}
