//! Multi-line pattern assembly: common-indent computation, blank-line
//! preservation, and attribute parsing (spec.md §4.3 pattern-body rules).

use super::expression::parse_placeable;
use super::ParseContext;
use crate::ast::{Attribute, Identifier, Pattern, PatternElement, Span};
use crate::cursor::{Cursor, ParseError, ParseResult};
use crate::primitives::parse_identifier;

pub(crate) fn skip_blank_inline(mut cursor: Cursor<'_>) -> Cursor<'_> {
    while !cursor.is_eof() && cursor.current() == ' ' {
        cursor = cursor.advance();
    }
    cursor
}

pub(crate) fn skip_blank_inline_nl(mut cursor: Cursor<'_>) -> Cursor<'_> {
    while !cursor.is_eof() && (cursor.current() == ' ' || cursor.current() == '\n') {
        cursor = cursor.advance();
    }
    cursor
}

struct RawLine {
    leading_spaces: usize,
    elements: Vec<PatternElement>,
    is_blank: bool,
}

/// Scans text and placeables on a single logical line, stopping at `\n` or
/// EOF without consuming it.
fn scan_line_content<'s>(
    cursor: Cursor<'s>,
    ctx: &mut ParseContext,
) -> Result<(Vec<PatternElement>, Cursor<'s>), ParseError> {
    let mut elements = Vec::new();
    let mut cur = cursor;
    let mut text_start = cur.pos();

    loop {
        if cur.is_eof() || cur.current() == '\n' {
            if cur.pos() > text_start {
                elements.push(PatternElement::TextElement(
                    Cursor::at(cur.source(), text_start).slice_to(cur.pos()).to_string(),
                ));
            }
            break;
        }

        if cur.current() == '{' {
            if cur.pos() > text_start {
                elements.push(PatternElement::TextElement(
                    Cursor::at(cur.source(), text_start).slice_to(cur.pos()).to_string(),
                ));
            }
            let pr = parse_placeable(cur, ctx)?;
            elements.push(PatternElement::Placeable(pr.value));
            cur = pr.cursor;
            text_start = cur.pos();
            continue;
        }

        cur = cur.advance();
    }

    Ok((elements, cur))
}

fn append_text(elements: &mut Vec<PatternElement>, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(PatternElement::TextElement(existing)) = elements.last_mut() {
        existing.push_str(&text);
    } else {
        elements.push(PatternElement::TextElement(text));
    }
}

fn append_element(elements: &mut Vec<PatternElement>, element: PatternElement) {
    match element {
        PatternElement::TextElement(t) => append_text(elements, t),
        other => elements.push(other),
    }
}

/// Parses the value-side of a message, term, attribute, or variant: the
/// remainder of the current line plus any indented continuation lines.
/// Returns `None` (not an error) when the pattern is entirely absent, so
/// callers can distinguish "no value" from "empty string value".
pub(crate) fn parse_pattern_opt<'s>(
    cursor: Cursor<'s>,
    ctx: &mut ParseContext,
) -> Result<(Option<Pattern>, Cursor<'s>), ParseError> {
    let (first_elements, mut cur) = scan_line_content(cursor, ctx)?;
    let mut raw_lines = vec![RawLine { leading_spaces: 0, elements: first_elements, is_blank: false }];

    loop {
        if cur.is_eof() || cur.current() != '\n' {
            break;
        }
        let after_nl = cur.advance();
        let mut probe = after_nl;
        let mut leading = 0usize;
        while !probe.is_eof() && probe.current() == ' ' {
            probe = probe.advance();
            leading += 1;
        }

        if probe.is_eof() {
            break;
        }
        if probe.current() == '\n' {
            raw_lines.push(RawLine { leading_spaces: 0, elements: Vec::new(), is_blank: true });
            cur = probe;
            continue;
        }
        if leading == 0 {
            break;
        }
        let first_ch = probe.current();
        // indented_char exclusion: `[` (variant key), `*` (default-variant
        // marker), `.` (attribute) never continue a pattern; `}` is the
        // closing delimiter of an enclosing placeable/select expression.
        if matches!(first_ch, '[' | '*' | '.' | '}') {
            break;
        }

        let (elements, new_cur) = scan_line_content(probe, ctx)?;
        raw_lines.push(RawLine { leading_spaces: leading, elements, is_blank: false });
        cur = new_cur;
    }

    while raw_lines.len() > 1 && raw_lines.last().is_some_and(|l| l.is_blank) {
        raw_lines.pop();
    }

    let common_indent = raw_lines
        .iter()
        .skip(1)
        .filter(|l| !l.is_blank)
        .map(|l| l.leading_spaces)
        .min()
        .unwrap_or(0);

    let mut elements: Vec<PatternElement> = Vec::new();
    for (i, line) in raw_lines.into_iter().enumerate() {
        if i > 0 {
            let extra = if line.is_blank { 0 } else { line.leading_spaces.saturating_sub(common_indent) };
            append_text(&mut elements, format!("\n{}", " ".repeat(extra)));
        }
        for el in line.elements {
            append_element(&mut elements, el);
        }
    }

    if let Some(PatternElement::TextElement(last)) = elements.last_mut() {
        let trimmed_len = last.trim_end_matches(' ').len();
        last.truncate(trimmed_len);
    }
    while matches!(elements.last(), Some(PatternElement::TextElement(t)) if t.is_empty()) {
        elements.pop();
    }

    if elements.is_empty() {
        Ok((None, cur))
    } else {
        Ok((Some(Pattern { elements }), cur))
    }
}

/// Parses zero or more `.ident = pattern` attributes following a message or
/// term's value. Leaves the cursor positioned at the `\n` preceding the
/// first non-attribute line (or at EOF), ready for the caller's own
/// continuation logic.
pub(crate) fn parse_attributes<'s>(
    mut cursor: Cursor<'s>,
    ctx: &mut ParseContext,
) -> Result<(Vec<Attribute>, Cursor<'s>), ParseError> {
    let mut attributes = Vec::new();

    loop {
        if cursor.is_eof() || cursor.current() != '\n' {
            return Ok((attributes, cursor));
        }
        let after_nl = cursor.advance();
        let mut probe = after_nl;
        while !probe.is_eof() && probe.current() == ' ' {
            probe = probe.advance();
        }
        if probe.is_eof() || probe.current() != '.' {
            return Ok((attributes, cursor));
        }

        let attr_start = probe.pos();
        let id_result = parse_identifier(probe.advance())?;
        let mut cur = skip_blank_inline(id_result.cursor);
        if cur.is_eof() || cur.current() != '=' {
            return Err(ParseError::expecting("Expected '=' in attribute", cur, &["="]));
        }
        cur = skip_blank_inline(cur.advance());

        let (value, cur) = parse_pattern_opt(cur, ctx)?;
        let value = value.ok_or_else(|| ParseError::new("Attribute requires a value", cur))?;

        attributes.push(Attribute {
            id: Identifier::new(id_result.value),
            value,
            span: Some(Span::new(attr_start, cur.pos())),
        });
        cursor = cur;
    }
}

pub(crate) type PatternParseResult<'s> = Result<ParseResult<'s, Option<Pattern>>, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseContext;

    fn pat(src: &str) -> Option<Pattern> {
        let mut ctx = ParseContext::new(100);
        let (p, _) = parse_pattern_opt(Cursor::new(src), &mut ctx).unwrap();
        p
    }

    #[test]
    fn single_line_text() {
        let p = pat("Hello!\n").unwrap();
        assert_eq!(p.elements, vec![PatternElement::TextElement("Hello!".into())]);
    }

    #[test]
    fn multiline_common_indent_stripped() {
        let src = "Line one\n    Line two\n    Line three\n";
        let p = pat(src).unwrap();
        let PatternElement::TextElement(t) = &p.elements[0] else { panic!() };
        assert_eq!(t, "Line one\nLine two\nLine three");
    }

    #[test]
    fn extra_indent_beyond_common_preserved() {
        let src = "Line one\n  indented\n    more indented\n";
        let p = pat(src).unwrap();
        let PatternElement::TextElement(t) = &p.elements[0] else { panic!() };
        assert_eq!(t, "Line one\nindented\n  more indented");
    }

    #[test]
    fn blank_continuation_preserved() {
        let src = "Line one\n\n  Line two\n";
        let p = pat(src).unwrap();
        let PatternElement::TextElement(t) = &p.elements[0] else { panic!() };
        assert_eq!(t, "Line one\n\nLine two");
    }

    #[test]
    fn tab_indent_does_not_continue() {
        let src = "Line one\n\tnot a continuation\n";
        let p = pat(src).unwrap();
        let PatternElement::TextElement(t) = &p.elements[0] else { panic!() };
        assert_eq!(t, "Line one");
    }

    #[test]
    fn empty_pattern_is_none() {
        assert!(pat("\nhello2 = x\n").is_none());
    }
}
