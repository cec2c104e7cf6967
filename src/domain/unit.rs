//! Documentation units extracted from source files

use serde::Serialize;

/// Where a documentation unit sits in its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// First comment run in the file, before any code
    Header,
    /// Comment run immediately preceding a top-level declaration
    Declaration,
}

/// A contiguous span of comment text tied to a file header or a declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentationUnit {
    pub kind: UnitKind,
    /// First line of the span (1-indexed)
    pub start_line: u32,
    /// Last line of the span (1-indexed, inclusive)
    pub end_line: u32,
    /// Source lines exactly as they appear in the file
    pub raw: String,
    /// Comment text with markers stripped, one entry per line
    pub content: Vec<String>,
    /// Declaration this unit documents, if one follows it
    pub declaration: Option<String>,
}

impl DocumentationUnit {
    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }

    pub fn is_header(&self) -> bool {
        self.kind == UnitKind::Header
    }

    /// Comment content joined with newlines
    pub fn text(&self) -> String {
        self.content.join("\n")
    }
}
