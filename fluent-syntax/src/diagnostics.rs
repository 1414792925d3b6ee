//! Stable diagnostic codes and line/column resolution.
//!
//! Parse errors live in the `E0xxx` range, validation warnings/errors in the
//! `5xxx` range (spec.md §3.3), kept separate so a caller can distinguish
//! "this FTL didn't parse" from "this FTL parsed but is semantically
//! suspicious" without string-matching messages.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // Parse errors (E0xxx)
    E0001UnterminatedStringLiteral,
    E0002InvalidEscapeSequence,
    E0003ExpectedToken,
    E0004IdentifierTooLong,
    E0005NumberTooLong,
    E0006StringLiteralTooLong,
    E0007MaxNestingDepthExceeded,
    E0008MissingDefaultVariant,
    E0009EmptyMessage,
    E0010MalformedNumber,
    E0011NonContinuationIndent,

    // Validation warnings/errors (5xxx)
    W5001DuplicateAttribute,
    E5002DuplicateNamedArgument,
    E5003SelectWithoutVariants,
    E5004SelectWithoutDefault,
    W5005CircularReference,
    W5006ShadowedEntry,
    W5007UndefinedReference,
}

impl DiagnosticCode {
    pub fn code_str(&self) -> &'static str {
        match self {
            DiagnosticCode::E0001UnterminatedStringLiteral => "E0001",
            DiagnosticCode::E0002InvalidEscapeSequence => "E0002",
            DiagnosticCode::E0003ExpectedToken => "E0003",
            DiagnosticCode::E0004IdentifierTooLong => "E0004",
            DiagnosticCode::E0005NumberTooLong => "E0005",
            DiagnosticCode::E0006StringLiteralTooLong => "E0006",
            DiagnosticCode::E0007MaxNestingDepthExceeded => "E0007",
            DiagnosticCode::E0008MissingDefaultVariant => "E0008",
            DiagnosticCode::E0009EmptyMessage => "E0009",
            DiagnosticCode::E0010MalformedNumber => "E0010",
            DiagnosticCode::E0011NonContinuationIndent => "E0011",
            DiagnosticCode::W5001DuplicateAttribute => "W5001",
            DiagnosticCode::E5002DuplicateNamedArgument => "E5002",
            DiagnosticCode::E5003SelectWithoutVariants => "E5003",
            DiagnosticCode::E5004SelectWithoutDefault => "E5004",
            DiagnosticCode::W5005CircularReference => "W5005",
            DiagnosticCode::W5006ShadowedEntry => "W5006",
            DiagnosticCode::W5007UndefinedReference => "W5007",
        }
    }

    pub fn is_warning(&self) -> bool {
        self.code_str().starts_with('W')
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code_str())
    }
}

/// One-past resolution of byte offsets to 1-based line/column, computed once
/// per normalized source buffer by scanning for `\n` bytes. Cheap to build
/// (`O(n)`) and `O(log n)` to query via binary search over line-start
/// offsets.
#[derive(Debug, Clone)]
pub struct LineOffsetCache {
    /// Byte offset of the first character of each line; `line_starts[0] == 0`.
    line_starts: Vec<usize>,
}

impl LineOffsetCache {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        LineOffsetCache { line_starts }
    }

    /// 1-based `(line, column)` for a byte offset. Column is a 1-based
    /// *byte* offset within the line (not a grapheme count), matching the
    /// byte-exact diagnostics spec.md §1 calls for.
    pub fn line_col(&self, pos: usize) -> (usize, usize) {
        let line_idx = match self.line_starts.binary_search(&pos) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        (line_idx + 1, pos - line_start + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_first_line() {
        let cache = LineOffsetCache::new("hello\nworld\n");
        assert_eq!(cache.line_col(0), (1, 1));
        assert_eq!(cache.line_col(4), (1, 5));
    }

    #[test]
    fn line_col_after_newline() {
        let cache = LineOffsetCache::new("hello\nworld\n");
        assert_eq!(cache.line_col(6), (2, 1));
        assert_eq!(cache.line_col(9), (2, 4));
    }

    #[test]
    fn normalization_makes_crlf_and_lf_identical() {
        let lf = LineOffsetCache::new("a\nb\nc");
        let normalized_crlf = "a\nb\nc"; // caller normalizes CRLF -> LF first
        let from_crlf = LineOffsetCache::new(normalized_crlf);
        assert_eq!(lf.line_col(4), from_crlf.line_col(4));
    }
}
