//! Source location tracking

use serde::{Deserialize, Serialize};
use std::fmt;

/// A span points at the source position a node was parsed from.
///
/// The external parser only reports lines and columns, so that is all
/// the compiler keeps. Line 0 means "no source position".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// 1-based line number
    #[serde(default)]
    pub line: u32,
    /// 1-based column number
    #[serde(default)]
    pub column: u32,
}

impl Span {
    /// Create a new span
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Span that only knows its line
    pub fn line(line: u32) -> Self {
        Self { line, column: 0 }
    }

    /// Create a dummy span (for testing and synthesized nodes)
    pub fn dummy() -> Self {
        Self { line: 0, column: 0 }
    }

    /// Check if the span carries a real position
    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::dummy()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column > 0 {
            write!(f, "line {}:{}", self.line, self.column)
        } else {
            write!(f, "line {}", self.line)
        }
    }
}
