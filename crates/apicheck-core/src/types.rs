//! Common types shared between the model, diagnostics and output modules.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Source Position
// ============================================================================

/// Where a unit was declared.
///
/// The default value is the unknown position (empty file, line 0). Positions
/// order by file, then line, then column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourcePosition {
    /// File path as given by the front-end.
    pub file: String,
    /// Line number (1-indexed, 0 when unknown).
    #[serde(default)]
    pub line: u32,
    /// Column number (1-indexed, 0 when unknown).
    #[serde(default)]
    pub col: u32,
}

impl SourcePosition {
    /// Create a position with file, line and column.
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        SourcePosition {
            file: file.into(),
            line,
            col,
        }
    }

    /// The unknown position.
    pub fn unknown() -> Self {
        SourcePosition::default()
    }

    /// Whether this position carries a file.
    pub fn is_known(&self) -> bool {
        !self.file.is_empty()
    }

    /// Parse `path:line` or `path:line:col`.
    ///
    /// The path itself may contain colons; line and column are taken from
    /// the right.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.rsplitn(3, ':');
        let last = parts.next()?;
        let middle = parts.next()?;
        match parts.next() {
            Some(file) if !file.is_empty() => {
                let line = middle.parse().ok()?;
                let col = last.parse().ok()?;
                Some(SourcePosition::new(file, line, col))
            }
            _ => {
                if middle.is_empty() {
                    return None;
                }
                let line = last.parse().ok()?;
                Some(SourcePosition::new(middle, line, 0))
            }
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_known() {
            return write!(f, "<unknown>");
        }
        if self.col == 0 {
            write!(f, "{}:{}", self.file, self.line)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.col)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod source_position_tests {
        use super::*;

        #[test]
        fn parse_line_and_col() {
            let pos = SourcePosition::parse("src/Foo.java:12:4").unwrap();
            assert_eq!(pos, SourcePosition::new("src/Foo.java", 12, 4));
        }

        #[test]
        fn parse_line_only() {
            let pos = SourcePosition::parse("api/current.txt:7").unwrap();
            assert_eq!(pos.file, "api/current.txt");
            assert_eq!(pos.line, 7);
            assert_eq!(pos.col, 0);
        }

        #[test]
        fn parse_rejects_missing_line() {
            assert!(SourcePosition::parse("Foo.java").is_none());
            assert!(SourcePosition::parse("Foo.java:x").is_none());
        }

        #[test]
        fn display_formats() {
            assert_eq!(SourcePosition::unknown().to_string(), "<unknown>");
            assert_eq!(SourcePosition::new("a.txt", 3, 0).to_string(), "a.txt:3");
            assert_eq!(SourcePosition::new("a.txt", 3, 9).to_string(), "a.txt:3:9");
        }

        #[test]
        fn ordering_is_file_then_line() {
            let a = SourcePosition::new("a.txt", 10, 1);
            let b = SourcePosition::new("a.txt", 2, 1);
            let c = SourcePosition::new("b.txt", 1, 1);
            let mut positions = vec![c.clone(), a.clone(), b.clone()];
            positions.sort();
            assert_eq!(positions, vec![b, a, c]);
        }
    }
}
