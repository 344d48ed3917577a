use serde::{Deserialize, Serialize};

/// Source location of a parse-tree node (1-based line, optional 1-based column).
///
/// The parser always supplies the line; a column of `0` means "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// A span that only knows its line.
    pub fn line(line: u32) -> Self {
        Self { line, column: 0 }
    }

    /// Create a dummy span for synthesized nodes.
    pub fn dummy() -> Self {
        Self::default()
    }

    pub fn has_column(&self) -> bool {
        self.column != 0
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_column() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "{}", self.line)
        }
    }
}
