//! Recursive-descent FTL parser.
//!
//! Produces a [`Resource`] from source bytes, recovering from local failures
//! by emitting [`ast::Junk`] entries so a later entry can still be parsed
//! (spec.md §4.3). The parser never panics on malformed input and never
//! raises for input errors: it always returns a `Resource`, and the presence
//! of `Junk` entries is the failure signal.

mod expression;
mod pattern;

use crate::ast::{self, Annotation, Comment, CommentKind, Entry, Junk, Message, Resource, Span, Term};
use crate::cursor::{Cursor, ParseError};
use crate::diagnostics::DiagnosticCode;
use crate::primitives::{is_identifier_char, is_identifier_start, parse_identifier};

pub(crate) use pattern::{parse_pattern_opt, skip_blank_inline, skip_blank_inline_nl};

/// Default nesting-depth budget (spec.md §4.8 "`MAX_DEPTH` (≈100)" governs
/// the resolver; the parser's own structural nesting cap is independent and
/// smaller since it bounds recursive-descent stack usage, not resolution
/// fuel).
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 100;

/// Hard ceiling on `max_nesting_depth`: `(recursion_limit - 50)` in the
/// reference; here a fixed numeric cap per Design Notes, since Rust manages
/// its stack explicitly rather than exposing a settable recursion limit.
pub const MAX_NESTING_DEPTH_CEILING: usize = 200;

/// Tracks recursive-descent depth while parsing placeables. Threaded
/// explicitly through every parse function (never ambient) so the parser
/// stays trivially re-entrant, per the cursor/primitives design.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParseContext {
    max_nesting_depth: usize,
    current_depth: usize,
}

impl ParseContext {
    fn new(max_nesting_depth: usize) -> Self {
        ParseContext { max_nesting_depth, current_depth: 0 }
    }

    pub(crate) fn enter(&mut self, cursor: Cursor<'_>) -> Result<(), ParseError> {
        self.current_depth += 1;
        if self.current_depth > self.max_nesting_depth {
            return Err(ParseError::new(
                format!(
                    "Maximum nesting depth ({}) exceeded",
                    self.max_nesting_depth
                ),
                cursor,
            ));
        }
        Ok(())
    }

    pub(crate) fn exit(&mut self) {
        self.current_depth = self.current_depth.saturating_sub(1);
    }
}

/// Normalizes CRLF and bare-CR line endings to LF. Must run before building
/// a [`crate::diagnostics::LineOffsetCache`] or parsing, so that positions
/// are stable regardless of the input's original line-ending convention
/// (spec.md §4.2, §8.1 idempotence property).
pub fn normalize_line_endings(source: &str) -> String {
    if !source.as_bytes().contains(&b'\r') {
        // Fast path: no CR bytes at all, nothing to normalize.
        return source.to_string();
    }
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

fn clamp_max_nesting_depth(requested: usize, diagnostics: &mut Vec<Annotation>) -> usize {
    if requested > MAX_NESTING_DEPTH_CEILING {
        log::warn!(
            "max_nesting_depth {requested} exceeds ceiling {MAX_NESTING_DEPTH_CEILING}, clamping"
        );
        diagnostics.push(Annotation {
            code: DiagnosticCode::E0007MaxNestingDepthExceeded,
            message: format!(
                "requested max_nesting_depth {requested} clamped to {MAX_NESTING_DEPTH_CEILING}"
            ),
            span: None,
        });
        MAX_NESTING_DEPTH_CEILING
    } else {
        requested
    }
}

/// Parses a complete FTL resource with the default nesting-depth budget.
pub fn parse(source: &str) -> Resource {
    parse_with_depth(source, DEFAULT_MAX_NESTING_DEPTH)
}

/// Parses a complete FTL resource, clamping `max_nesting_depth` to
/// [`MAX_NESTING_DEPTH_CEILING`] and logging a clamp event if it is exceeded.
pub fn parse_with_depth(source: &str, max_nesting_depth: usize) -> Resource {
    let normalized = normalize_line_endings(source);
    let mut resource_diagnostics = Vec::new();
    let clamped = clamp_max_nesting_depth(max_nesting_depth, &mut resource_diagnostics);

    let mut entries = Vec::new();
    let mut cursor = Cursor::new(&normalized);

    loop {
        cursor = skip_blank_block(cursor);
        if cursor.is_eof() {
            break;
        }

        let entry_start = cursor;

        if cursor.current() == '#' {
            let (comment, after_comment) = parse_comment(cursor);
            cursor = after_comment;

            let immediately_followed_by_entry = !cursor.is_eof()
                && (is_identifier_start(cursor.current()) || cursor.current() == '-');

            if matches!(comment.kind, CommentKind::Comment) && immediately_followed_by_entry {
                let mut ctx = ParseContext::new(clamped);
                match parse_entry_body(cursor, &mut ctx) {
                    Ok(pr) => {
                        let entry = attach_comment(pr.value, comment);
                        entries.push(entry);
                        cursor = pr.cursor;
                    }
                    Err(err) => {
                        entries.push(Entry::Comment(comment));
                        let (junk, next) = recover_to_junk(cursor, err);
                        entries.push(Entry::Junk(junk));
                        cursor = next;
                    }
                }
            } else {
                entries.push(Entry::Comment(comment));
            }
            continue;
        }

        let mut ctx = ParseContext::new(clamped);
        match parse_entry_body(entry_start, &mut ctx) {
            Ok(pr) => {
                entries.push(pr.value);
                cursor = pr.cursor;
            }
            Err(err) => {
                let (junk, next) = recover_to_junk(entry_start, err);
                entries.push(Entry::Junk(junk));
                cursor = next;
            }
        }
    }

    Resource { entries, diagnostics: resource_diagnostics }
}

fn attach_comment(entry: Entry, comment: Comment) -> Entry {
    match entry {
        Entry::Message(mut m) => {
            m.comment = Some(comment);
            Entry::Message(m)
        }
        Entry::Term(mut t) => {
            t.comment = Some(comment);
            Entry::Term(t)
        }
        other => other,
    }
}

fn parse_entry_body<'s>(
    cursor: Cursor<'s>,
    ctx: &mut ParseContext,
) -> Result<crate::cursor::ParseResult<'s, Entry>, ParseError> {
    if !cursor.is_eof() && cursor.current() == '-' {
        parse_term(cursor, ctx).map(|pr| pr.map(Entry::Term))
    } else {
        parse_message(cursor, ctx).map(|pr| pr.map(Entry::Message))
    }
}

/// Skips blank-only lines (runs of spaces/tabs followed by a newline, or
/// fully empty lines) between entries. Does not skip indentation that
/// belongs to a continuation line, since this is only ever called at a
/// top-level entry boundary.
fn skip_blank_block(mut cursor: Cursor<'_>) -> Cursor<'_> {
    loop {
        let line_start = cursor;
        let mut probe = cursor;
        while !probe.is_eof() && (probe.current() == ' ' || probe.current() == '\t') {
            probe = probe.advance();
        }
        if !probe.is_eof() && probe.current() == '\n' {
            cursor = probe.advance();
        } else if probe.is_eof() {
            cursor = probe;
            break;
        } else {
            cursor = line_start;
            break;
        }
    }
    cursor
}

/// `'#' ('#' '#'?)? ' '? text (NEWLINE same-prefix text)*`
fn parse_comment(cursor: Cursor<'_>) -> (Comment, Cursor<'_>) {
    let start = cursor.pos();
    let mut level = 0usize;
    let mut cur = cursor;
    while !cur.is_eof() && cur.current() == '#' && level < 3 {
        cur = cur.advance();
        level += 1;
    }
    let kind = match level {
        1 => CommentKind::Comment,
        2 => CommentKind::Group,
        _ => CommentKind::Resource,
    };

    let mut lines: Vec<&str> = Vec::new();
    loop {
        if !cur.is_eof() && cur.current() == ' ' {
            cur = cur.advance();
        }
        let line_start = cur.pos();
        while !cur.is_eof() && cur.current() != '\n' {
            cur = cur.advance();
        }
        lines.push(Cursor::at(cur.source(), line_start).slice_to(cur.pos()));

        if cur.is_eof() {
            break;
        }
        let after_newline = cur.advance();

        let mut probe = after_newline;
        let mut probe_level = 0usize;
        while !probe.is_eof() && probe.current() == '#' && probe_level <= level {
            probe = probe.advance();
            probe_level += 1;
        }
        if probe_level == level {
            cur = probe;
        } else {
            cur = after_newline;
            break;
        }
    }

    let content = lines.join("\n");
    let end = cur.pos();
    (
        Comment { content, kind, span: Some(Span::new(start, end)) },
        cur,
    )
}

fn parse_message<'s>(
    cursor: Cursor<'s>,
    ctx: &mut ParseContext,
) -> Result<crate::cursor::ParseResult<'s, Message>, ParseError> {
    let start = cursor.pos();
    let id_result = parse_identifier(cursor)?;
    let mut cur = skip_blank_inline(id_result.cursor);

    if cur.is_eof() || cur.current() != '=' {
        return Err(ParseError::expecting("Expected '='", cur, &["="]));
    }
    cur = skip_blank_inline(cur.advance());

    let (value, cur) = parse_pattern_opt(cur, ctx)?;
    let (attributes, cur) = pattern::parse_attributes(cur, ctx)?;

    if value.is_none() && attributes.is_empty() {
        return Err(ParseError::new(
            "Message has neither a value nor any attributes",
            cur,
        ));
    }

    let message = Message {
        id: ast::Identifier::new(id_result.value),
        value,
        attributes,
        comment: None,
        span: Some(Span::new(start, cur.pos())),
    };
    Ok(crate::cursor::ParseResult::new(message, cur))
}

fn parse_term<'s>(
    cursor: Cursor<'s>,
    ctx: &mut ParseContext,
) -> Result<crate::cursor::ParseResult<'s, Term>, ParseError> {
    let start = cursor.pos();
    if cursor.is_eof() || cursor.current() != '-' {
        return Err(ParseError::expecting("Expected '-'", cursor, &["-"]));
    }
    let after_dash = cursor.advance();
    let id_result = parse_identifier(after_dash)?;
    let mut cur = skip_blank_inline(id_result.cursor);

    if cur.is_eof() || cur.current() != '=' {
        return Err(ParseError::expecting("Expected '='", cur, &["="]));
    }
    cur = skip_blank_inline(cur.advance());

    let (value, cur) = parse_pattern_opt(cur, ctx)?;
    let value = value.ok_or_else(|| ParseError::new("Term requires a value", cur))?;
    let (attributes, cur) = pattern::parse_attributes(cur, ctx)?;

    let term = Term {
        id: ast::Identifier::new(id_result.value),
        value,
        attributes,
        comment: None,
        span: Some(Span::new(start, cur.pos())),
    };
    Ok(crate::cursor::ParseResult::new(term, cur))
}

/// Scans forward from the point of failure to the next line whose first
/// (non-indented) character could start a new entry: an identifier, `-`,
/// `#`, or EOF. Every byte up to that point becomes the `Junk` entry's
/// content (spec.md §4.3 Junk policy, §8.1 Junk bracketing property).
fn recover_to_junk<'s>(entry_start: Cursor<'s>, error: ParseError) -> (Junk, Cursor<'s>) {
    let mut cur = entry_start;
    loop {
        while !cur.is_eof() && cur.current() != '\n' {
            cur = cur.advance();
        }
        if cur.is_eof() {
            break;
        }
        cur = cur.advance();
        if cur.is_eof() {
            break;
        }
        let ch = cur.current();
        if is_identifier_start(ch) || ch == '-' || ch == '#' {
            break;
        }
    }

    let content = Cursor::at(entry_start.source(), entry_start.pos())
        .slice_to(cur.pos())
        .to_string();
    let junk = Junk {
        content,
        annotations: vec![Annotation {
            code: classify_error(&error),
            message: error.message.clone(),
            span: Some(Span::new(error.pos, error.pos)),
        }],
        span: Some(Span::new(entry_start.pos(), cur.pos())),
    };
    (junk, cur)
}

fn classify_error(error: &ParseError) -> DiagnosticCode {
    let msg = error.message.as_str();
    if msg.contains("Unterminated string literal") {
        DiagnosticCode::E0001UnterminatedStringLiteral
    } else if msg.contains("escape") || msg.contains("surrogate") || msg.contains("code point") {
        DiagnosticCode::E0002InvalidEscapeSequence
    } else if msg.contains("exceeds maximum length") && msg.contains("Identifier") {
        DiagnosticCode::E0004IdentifierTooLong
    } else if msg.contains("exceeds maximum length") && msg.contains("Number") {
        DiagnosticCode::E0005NumberTooLong
    } else if msg.contains("exceeds maximum length") && msg.contains("String") {
        DiagnosticCode::E0006StringLiteralTooLong
    } else if msg.contains("nesting depth") {
        DiagnosticCode::E0007MaxNestingDepthExceeded
    } else if msg.contains("default variant") || msg.contains("no default") {
        DiagnosticCode::E0008MissingDefaultVariant
    } else if msg.contains("neither a value nor any attributes") {
        DiagnosticCode::E0009EmptyMessage
    } else if msg.contains("Expected number") || msg.contains("digit after decimal") {
        DiagnosticCode::E0010MalformedNumber
    } else {
        DiagnosticCode::E0003ExpectedToken
    }
}

pub(crate) fn is_variant_start(cursor: Cursor<'_>) -> bool {
    !cursor.is_eof() && (cursor.current() == '[' || cursor.current() == '*')
}

pub(crate) fn is_attribute_start(cursor: Cursor<'_>) -> bool {
    !cursor.is_eof() && cursor.current() == '.'
}

pub(crate) fn ident_char_predicate(ch: char) -> bool {
    is_identifier_char(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_crlf_and_cr() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\n"), "a\nb\nc\n");
    }

    #[test]
    fn simple_message() {
        let res = parse("hello = Hi!\n");
        assert_eq!(res.entries.len(), 1);
        match &res.entries[0] {
            Entry::Message(m) => {
                assert_eq!(m.id.name, "hello");
                assert!(m.value.is_some());
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn junk_bracketing_covers_all_input() {
        let source = "bad entry\nhello = Hi!\n";
        let res = parse(source);
        // first becomes Junk, second parses fine.
        assert!(matches!(res.entries[0], Entry::Junk(_)));
        assert!(res.entries.iter().any(|e| matches!(e, Entry::Message(_))));
    }

    #[test]
    fn term_requires_value() {
        let source = "-brand-name =\n";
        let res = parse(source);
        assert!(matches!(res.entries[0], Entry::Junk(_)));
    }

    #[test]
    fn attached_comment() {
        let source = "# A greeting\nhello = Hi!\n";
        let res = parse(source);
        match &res.entries[0] {
            Entry::Message(m) => assert!(m.comment.is_some()),
            other => panic!("expected message with comment, got {other:?}"),
        }
    }

    #[test]
    fn standalone_group_comment_not_attached() {
        let source = "## Group\n\nhello = Hi!\n";
        let res = parse(source);
        assert!(matches!(res.entries[0], Entry::Comment(_)));
        assert!(matches!(res.entries[1], Entry::Message(_)));
    }
}
