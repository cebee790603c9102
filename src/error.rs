//! Error types
//!
//! Parser helpers report [`ParseError`], the XPath surface reports
//! [`EvaluationError`], and [`Error`] wraps both for session operations.

use thiserror::Error;

/// Crate-level result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for session operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    Parse(#[from] ParseError),

    #[error("XPath error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("No XML loaded: load a document before generating a schema")]
    SchemaUnavailable,

    #[error("No XML loaded")]
    NotLoaded,

    #[error("Export failed: {0}")]
    Export(String),
}

/// Well-formedness violation reported by the strict reader
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the source text
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    /// Create an error at `position`, without line information yet
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
            line: 0,
            column: 0,
        }
    }

    /// Resolve line and column (both 1-based) against the source text
    pub fn locate(mut self, input: &str) -> Self {
        let end = self.position.min(input.len());
        let before = &input.as_bytes()[..end];
        self.line = memchr::memchr_iter(b'\n', before).count() + 1;
        let line_start = memchr::memrchr(b'\n', before).map(|p| p + 1).unwrap_or(0);
        self.column = String::from_utf8_lossy(&before[line_start..]).chars().count() + 1;
        self
    }
}

/// XPath compile or evaluation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("No XML loaded")]
    NoDocument,

    #[error("Please enter an XPath expression")]
    Empty,

    #[error("Invalid XPath expression: {0}")]
    Syntax(String),

    #[error("Namespace prefix '{0}' is not declared in the document")]
    UnboundPrefix(String),

    #[error("Expression returned a {0}, not a node-set")]
    NotNodeSet(&'static str),

    #[error("XPath evaluation failed: {0}")]
    Evaluation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_line_and_column() {
        let input = "<a>\n  <b>\n</a>";
        let err = ParseError::new("mismatched tag", input.find("</a>").unwrap()).locate(input);
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 1);
        assert_eq!(err.to_string(), "mismatched tag at line 3, column 1");
    }

    #[test]
    fn test_error_wrapping() {
        let err: Error = EvaluationError::NotNodeSet("number").into();
        assert_eq!(err.to_string(), "XPath error: Expression returned a number, not a node-set");
        assert!(Error::SchemaUnavailable.to_string().contains("No XML loaded"));
    }
}
