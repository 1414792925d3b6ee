//! Low-level parsers for identifiers, numbers, and string literals, per the
//! Fluent specification. Ported from `ftllexengine.syntax.parser.primitives`:
//! same grammar, same DoS-prevention length limits, same escape handling —
//! expressed as `Result`-returning pure functions instead of a `ParseResult |
//! ParseError` union, since Rust's `Result` already is that union.

use crate::cursor::{Cursor, ParseError, ParseResult};

/// Hard caps mirroring the Python reference's `_MAX_NUMBER_LENGTH` /
/// `_MAX_STRING_LITERAL_LENGTH` / `MAX_IDENTIFIER_LENGTH`. These exist purely
/// to bound parse time and memory on adversarial input; well-formed FTL never
/// comes close.
pub const MAX_IDENTIFIER_LENGTH: usize = 1024;
pub const MAX_NUMBER_LENGTH: usize = 1000;
pub const MAX_STRING_LITERAL_LENGTH: usize = 1_000_000;

const UNICODE_ESCAPE_LEN_SHORT: usize = 4;
const UNICODE_ESCAPE_LEN_LONG: usize = 6;
const MAX_UNICODE_CODE_POINT: u32 = 0x10_FFFF;
const SURROGATE_RANGE_START: u32 = 0xD800;
const SURROGATE_RANGE_END: u32 = 0xDFFF;

pub fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic()
}

pub fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// `[A-Za-z][A-Za-z0-9_-]*`
///
/// Only ASCII letters start or continue an identifier: Unicode letters like
/// `é` are rejected for cross-implementation compatibility with the
/// JavaScript and original Rust Fluent implementations.
pub fn parse_identifier<'s>(cursor: Cursor<'s>) -> Result<ParseResult<'s, &'s str>, ParseError> {
    if cursor.is_eof() || !is_identifier_start(cursor.current()) {
        return Err(ParseError::expecting(
            "Expected identifier (must start with ASCII letter a-z or A-Z)",
            cursor,
            &["a-z", "A-Z"],
        ));
    }

    let start_pos = cursor.pos();
    let mut cur = cursor.advance();

    while !cur.is_eof() {
        let ch = cur.current();
        if is_identifier_char(ch) {
            cur = cur.advance();
            if cur.pos() - start_pos > MAX_IDENTIFIER_LENGTH {
                return Err(ParseError::new(
                    format!("Identifier exceeds maximum length ({MAX_IDENTIFIER_LENGTH} chars)"),
                    cur,
                ));
            }
        } else {
            break;
        }
    }

    let ident = cursor.slice_to(cur.pos());
    Ok(ParseResult::new(ident, cur))
}

/// `-?[0-9]+(\.[0-9]+)?`
///
/// Returns the raw matched string; decoding into an integer or an
/// arbitrary-precision decimal is the caller's job (see
/// `fluent_bundle::types::number`), exactly as in the Python reference where
/// `parse_number` and `parse_number_value` are split.
pub fn parse_number<'s>(cursor: Cursor<'s>) -> Result<ParseResult<'s, &'s str>, ParseError> {
    let start_pos = cursor.pos();
    let mut cur = cursor;

    if !cur.is_eof() && cur.current() == '-' {
        cur = cur.advance();
    }

    if cur.is_eof() || !cur.current().is_ascii_digit() {
        return Err(ParseError::expecting("Expected number", cur, &["0-9"]));
    }

    while !cur.is_eof() && cur.current().is_ascii_digit() {
        cur = cur.advance();
        if cur.pos() - start_pos > MAX_NUMBER_LENGTH {
            return Err(ParseError::new(
                format!("Number exceeds maximum length ({MAX_NUMBER_LENGTH} chars)"),
                cur,
            ));
        }
    }

    if !cur.is_eof() && cur.current() == '.' {
        cur = cur.advance();
        if cur.is_eof() || !cur.current().is_ascii_digit() {
            return Err(ParseError::expecting(
                "Expected digit after decimal point",
                cur,
                &["0-9"],
            ));
        }
        while !cur.is_eof() && cur.current().is_ascii_digit() {
            cur = cur.advance();
            if cur.pos() - start_pos > MAX_NUMBER_LENGTH {
                return Err(ParseError::new(
                    format!("Number exceeds maximum length ({MAX_NUMBER_LENGTH} chars)"),
                    cur,
                ));
            }
        }
    }

    let number_str = cursor.slice_to(cur.pos());
    Ok(ParseResult::new(number_str, cur))
}

/// Parses one escape sequence, with `cursor` positioned just after the
/// backslash. Supports `\"`, `\\`, `\n`, `\t`, `\uXXXX`, `\UXXXXXX`.
fn parse_escape_sequence(cursor: Cursor<'_>) -> Result<(char, Cursor<'_>), ParseError> {
    if cursor.is_eof() {
        return Err(ParseError::new("Unexpected EOF in escape sequence", cursor));
    }

    let escape_ch = cursor.current();
    match escape_ch {
        '"' => Ok(('"', cursor.advance())),
        '\\' => Ok(('\\', cursor.advance())),
        'n' => Ok(('\n', cursor.advance())),
        't' => Ok(('\t', cursor.advance())),
        'u' => parse_unicode_escape(cursor.advance(), UNICODE_ESCAPE_LEN_SHORT),
        'U' => parse_unicode_escape(cursor.advance(), UNICODE_ESCAPE_LEN_LONG),
        other => Err(ParseError::new(
            format!("Invalid escape sequence: \\{other}"),
            cursor,
        )),
    }
}

fn parse_unicode_escape(cursor: Cursor<'_>, len: usize) -> Result<(char, Cursor<'_>), ParseError> {
    let hex_digits = cursor.slice_ahead(len);
    if hex_digits.len() < len || !hex_digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParseError::expecting(
            format!("Invalid Unicode escape (expected {len} hex digits)"),
            cursor,
            &["0-9", "a-f", "A-F"],
        ));
    }
    let advanced = cursor.advance_n(len);
    let code_point = u32::from_str_radix(hex_digits, 16).expect("validated hex digits");

    if (SURROGATE_RANGE_START..=SURROGATE_RANGE_END).contains(&code_point) {
        return Err(ParseError::new(
            format!("Invalid surrogate code point: U+{hex_digits} (surrogates not allowed)"),
            advanced,
        ));
    }
    if code_point > MAX_UNICODE_CODE_POINT {
        return Err(ParseError::new(
            format!("Invalid Unicode code point: U+{hex_digits} (max U+10FFFF)"),
            advanced,
        ));
    }
    let ch = char::from_u32(code_point).ok_or_else(|| {
        ParseError::new(format!("Invalid Unicode code point: U+{hex_digits}"), advanced)
    })?;
    Ok((ch, advanced))
}

/// `'"' quoted_char* '"'` with escapes; raw line endings inside the literal
/// are a parse error (the normalizer has already collapsed CRLF/CR to LF, so
/// any `\n` seen here was a literal newline in the source, not an escape).
pub fn parse_string_literal<'s>(
    cursor: Cursor<'s>,
) -> Result<ParseResult<'s, String>, ParseError> {
    if cursor.is_eof() || cursor.current() != '"' {
        return Err(ParseError::expecting("Expected opening quote", cursor, &["\""]));
    }

    let mut cur = cursor.advance();
    let mut chars = String::new();

    while !cur.is_eof() {
        if chars.len() > MAX_STRING_LITERAL_LENGTH {
            return Err(ParseError::new(
                format!("String literal exceeds maximum length ({MAX_STRING_LITERAL_LENGTH} chars)"),
                cur,
            ));
        }

        let ch = cur.current();
        if ch == '"' {
            return Ok(ParseResult::new(chars, cur.advance()));
        }
        if ch == '\n' {
            return Err(ParseError::new(
                "Line endings not allowed in string literals (use \\n escape)",
                cur,
            ));
        }
        if ch == '\\' {
            cur = cur.advance();
            let (escaped, next) = parse_escape_sequence(cur)?;
            chars.push(escaped);
            cur = next;
        } else {
            chars.push(ch);
            cur = cur.advance();
        }
    }

    Err(ParseError::expecting("Unterminated string literal", cur, &["\""]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_basic() {
        let c = Cursor::new("hello-world_2 =");
        let r = parse_identifier(c).unwrap();
        assert_eq!(r.value, "hello-world_2");
    }

    #[test]
    fn identifier_rejects_unicode_leader() {
        let c = Cursor::new("éclair");
        assert!(parse_identifier(c).is_err());
    }

    #[test]
    fn identifier_length_limit() {
        let long = "a".repeat(MAX_IDENTIFIER_LENGTH + 10);
        let c = Cursor::new(&long);
        assert!(parse_identifier(c).is_err());
    }

    #[test]
    fn number_integer_and_decimal() {
        assert_eq!(parse_number(Cursor::new("42")).unwrap().value, "42");
        assert_eq!(parse_number(Cursor::new("-3.14")).unwrap().value, "-3.14");
        assert_eq!(parse_number(Cursor::new("0.001x")).unwrap().value, "0.001");
    }

    #[test]
    fn number_requires_digit_after_dot() {
        assert!(parse_number(Cursor::new("1.")).is_err());
    }

    #[test]
    fn string_literal_escapes() {
        let r = parse_string_literal(Cursor::new(r#""with \"quotes\"""#)).unwrap();
        assert_eq!(r.value, "with \"quotes\"");

        let r = parse_string_literal(Cursor::new(r#""unicode: ä""#)).unwrap();
        assert_eq!(r.value, "unicode: ä");

        let r = parse_string_literal(Cursor::new(r#""emoji: \U01F600""#)).unwrap();
        assert_eq!(r.value, "emoji: \u{1F600}");
    }

    #[test]
    fn string_literal_rejects_surrogate() {
        assert!(parse_string_literal(Cursor::new(r#""\uD800""#)).is_err());
    }

    #[test]
    fn string_literal_rejects_raw_newline() {
        assert!(parse_string_literal(Cursor::new("\"a\nb\"")).is_err());
    }

    #[test]
    fn string_literal_unterminated() {
        assert!(parse_string_literal(Cursor::new("\"abc")).is_err());
    }
}
