//! Placeables, inline expressions, select expressions, and call arguments.

use super::pattern::{parse_pattern_opt, skip_blank_inline, skip_blank_inline_nl};
use super::ParseContext;
use crate::ast::{
    CallArguments, Expression, Identifier, InlineExpression, NamedArgument, SelectExpression, Span,
    Variant, VariantKey,
};
use crate::cursor::{Cursor, ParseError, ParseResult};
use crate::primitives::{is_identifier_start, parse_identifier, parse_number, parse_string_literal};

/// `'{' blank? (InlineExpression | SelectExpression) blank? '}'`
pub(crate) fn parse_placeable<'s>(
    cursor: Cursor<'s>,
    ctx: &mut ParseContext,
) -> Result<ParseResult<'s, Expression>, ParseError> {
    let start = cursor.pos();
    if cursor.is_eof() || cursor.current() != '{' {
        return Err(ParseError::expecting("Expected '{'", cursor, &["{"]));
    }
    ctx.enter(cursor)?;

    let cur = skip_blank_inline_nl(cursor.advance());
    let selector = parse_inline_expression(cur, ctx)?;
    let cur = skip_blank_inline_nl(selector.cursor);

    let expr = if cur.starts_with("->") {
        let cur = skip_blank_inline(cur.advance_n(2));
        let (variants, cur) = parse_variant_list(cur, ctx)?;
        let select = SelectExpression {
            selector: Box::new(selector.value),
            variants,
            span: Some(Span::new(start, cur.pos())),
        };
        ParseResult::new(Expression::Select(select), cur)
    } else {
        ParseResult::new(Expression::Inline(selector.value), cur)
    };

    let cur = skip_blank_inline_nl(expr.cursor);
    if cur.is_eof() || cur.current() != '}' {
        ctx.exit();
        return Err(ParseError::expecting("Expected '}'", cur, &["}"]));
    }
    ctx.exit();
    Ok(ParseResult::new(expr.value, cur.advance()))
}

fn parse_variant_list<'s>(
    mut cursor: Cursor<'s>,
    ctx: &mut ParseContext,
) -> Result<(Vec<Variant>, Cursor<'s>), ParseError> {
    let mut variants = Vec::new();

    loop {
        cursor = skip_to_next_variant_line(cursor);
        if !super::is_variant_start(cursor) {
            break;
        }
        let (variant, next) = parse_variant(cursor, ctx)?;
        variants.push(variant);
        cursor = next;
    }

    if variants.is_empty() {
        return Err(ParseError::new("Select expression has no variants", cursor));
    }
    if variants.iter().filter(|v| v.default).count() != 1 {
        return Err(ParseError::new(
            "Select expression must have exactly one default variant",
            cursor,
        ));
    }

    Ok((variants, cursor))
}

/// Skips the newline and leading spaces before the next prospective variant
/// line, without committing to consuming anything if it doesn't pan out to
/// be `[` or `*[`.
fn skip_to_next_variant_line(cursor: Cursor<'_>) -> Cursor<'_> {
    if cursor.is_eof() {
        return cursor;
    }
    if cursor.current() == '\n' {
        let mut probe = cursor.advance();
        while !probe.is_eof() && probe.current() == ' ' {
            probe = probe.advance();
        }
        return probe;
    }
    // Already positioned at a variant marker on the same scan (e.g. right
    // after `->`).
    skip_blank_inline(cursor)
}

fn parse_variant<'s>(
    cursor: Cursor<'s>,
    ctx: &mut ParseContext,
) -> Result<(Variant, Cursor<'s>), ParseError> {
    let start = cursor.pos();
    let (default, cur) = if cursor.current() == '*' {
        (true, cursor.advance())
    } else {
        (false, cursor)
    };

    if cur.is_eof() || cur.current() != '[' {
        return Err(ParseError::expecting("Expected '['", cur, &["["]));
    }
    let cur = skip_blank_inline_nl(cur.advance());

    let (key, cur) = parse_variant_key(cur)?;
    let cur = skip_blank_inline_nl(cur);

    if cur.is_eof() || cur.current() != ']' {
        return Err(ParseError::expecting("Expected ']'", cur, &["]"]));
    }
    let cur = skip_blank_inline(cur.advance());

    let (value, cur) = parse_pattern_opt(cur, ctx)?;
    let value = value.unwrap_or_default();

    Ok((
        Variant { key, value, default, span: Some(Span::new(start, cur.pos())) },
        cur,
    ))
}

fn parse_variant_key(cursor: Cursor<'_>) -> Result<(VariantKey, Cursor<'_>), ParseError> {
    if cursor.is_eof() {
        return Err(ParseError::new("Expected variant key", cursor));
    }
    if cursor.current() == '-' || cursor.current().is_ascii_digit() {
        let r = parse_number(cursor)?;
        Ok((
            VariantKey::NumberLiteral { raw: r.value.to_string(), span: Some(Span::new(cursor.pos(), r.cursor.pos())) },
            r.cursor,
        ))
    } else {
        let r = parse_identifier(cursor)?;
        Ok((VariantKey::Identifier(Identifier::new(r.value)), r.cursor))
    }
}

/// Parses one `InlineExpression`. Dispatches on the leading character;
/// `-` is ambiguous between a negative `NumberLiteral` and a `TermReference`
/// and is resolved by peeking the following character.
pub(crate) fn parse_inline_expression<'s>(
    cursor: Cursor<'s>,
    ctx: &mut ParseContext,
) -> Result<ParseResult<'s, InlineExpression>, ParseError> {
    if cursor.is_eof() {
        return Err(ParseError::new("Unexpected EOF in expression", cursor));
    }

    let start = cursor.pos();
    match cursor.current() {
        '"' => {
            let r = parse_string_literal(cursor)?;
            Ok(ParseResult::new(
                InlineExpression::StringLiteral { value: r.value, span: Some(Span::new(start, r.cursor.pos())) },
                r.cursor,
            ))
        }
        '$' => {
            let r = parse_identifier(cursor.advance())?;
            Ok(ParseResult::new(
                InlineExpression::VariableReference {
                    id: Identifier::new(r.value),
                    span: Some(Span::new(start, r.cursor.pos())),
                },
                r.cursor,
            ))
        }
        '{' => {
            let r = parse_placeable(cursor, ctx)?;
            Ok(ParseResult::new(
                InlineExpression::Placeable { expression: Box::new(r.value), span: Some(Span::new(start, r.cursor.pos())) },
                r.cursor,
            ))
        }
        '-' if !matches!(cursor.advance().current_opt(), Some(c) if c.is_ascii_digit()) => {
            parse_term_reference(cursor, ctx, start)
        }
        '-' | '0'..='9' => {
            let r = parse_number(cursor)?;
            Ok(ParseResult::new(
                InlineExpression::NumberLiteral { raw: r.value.to_string(), span: Some(Span::new(start, r.cursor.pos())) },
                r.cursor,
            ))
        }
        c if c.is_ascii_uppercase() => {
            let id = parse_identifier(cursor)?;
            if !id.cursor.is_eof() && id.cursor.current() == '(' {
                let (arguments, cur) = parse_call_arguments(id.cursor, ctx)?;
                Ok(ParseResult::new(
                    InlineExpression::FunctionReference {
                        id: Identifier::new(id.value),
                        arguments,
                        span: Some(Span::new(start, cur.pos())),
                    },
                    cur,
                ))
            } else {
                parse_message_reference_tail(id.value, id.cursor, start)
            }
        }
        c if is_identifier_start(c) => {
            let id = parse_identifier(cursor)?;
            parse_message_reference_tail(id.value, id.cursor, start)
        }
        other => Err(ParseError::new(format!("Unexpected character '{other}' in expression"), cursor)),
    }
}

fn parse_message_reference_tail<'s>(
    name: &'s str,
    cursor: Cursor<'s>,
    start: usize,
) -> Result<ParseResult<'s, InlineExpression>, ParseError> {
    let (attribute, cur) = parse_optional_attribute_ref(cursor)?;
    Ok(ParseResult::new(
        InlineExpression::MessageReference {
            id: Identifier::new(name),
            attribute,
            span: Some(Span::new(start, cur.pos())),
        },
        cur,
    ))
}

fn parse_term_reference<'s>(
    cursor: Cursor<'s>,
    ctx: &mut ParseContext,
    start: usize,
) -> Result<ParseResult<'s, InlineExpression>, ParseError> {
    let after_dash = cursor.advance();
    let id = parse_identifier(after_dash)?;
    let (attribute, cur) = parse_optional_attribute_ref(id.cursor)?;
    let (arguments, cur) = if !cur.is_eof() && cur.current() == '(' {
        let (args, c) = parse_call_arguments(cur, ctx)?;
        (Some(args), c)
    } else {
        (None, cur)
    };
    Ok(ParseResult::new(
        InlineExpression::TermReference {
            id: Identifier::new(id.value),
            attribute,
            arguments,
            span: Some(Span::new(start, cur.pos())),
        },
        cur,
    ))
}

fn parse_optional_attribute_ref(cursor: Cursor<'_>) -> Result<(Option<Identifier>, Cursor<'_>), ParseError> {
    if !cursor.is_eof() && cursor.current() == '.' {
        let r = parse_identifier(cursor.advance())?;
        Ok((Some(Identifier::new(r.value)), r.cursor))
    } else {
        Ok((None, cursor))
    }
}

fn parse_call_arguments<'s>(
    cursor: Cursor<'s>,
    ctx: &mut ParseContext,
) -> Result<(CallArguments, Cursor<'s>), ParseError> {
    debug_assert_eq!(cursor.current(), '(');
    let mut cur = skip_blank_inline_nl(cursor.advance());
    let mut args = CallArguments::default();

    if !cur.is_eof() && cur.current() == ')' {
        return Ok((args, cur.advance()));
    }

    loop {
        let start = cur.pos();
        if is_identifier_start(cur.current_opt().unwrap_or(' ')) {
            let id = parse_identifier(cur)?;
            let after_id = skip_blank_inline_nl(id.cursor);
            if !after_id.is_eof() && after_id.current() == ':' {
                let value_cursor = skip_blank_inline_nl(after_id.advance());
                let value = parse_named_argument_value(value_cursor)?;
                args.named.push(NamedArgument {
                    name: Identifier::new(id.value),
                    value: value.value,
                    span: Some(Span::new(start, value.cursor.pos())),
                });
                cur = value.cursor;
            } else {
                let expr = parse_inline_expression(cur, ctx)?;
                args.positional.push(expr.value);
                cur = expr.cursor;
            }
        } else {
            let expr = parse_inline_expression(cur, ctx)?;
            args.positional.push(expr.value);
            cur = expr.cursor;
        }

        cur = skip_blank_inline_nl(cur);
        if cur.is_eof() {
            return Err(ParseError::expecting("Unterminated call arguments", cur, &[")"]));
        }
        match cur.current() {
            ',' => {
                cur = skip_blank_inline_nl(cur.advance());
            }
            ')' => return Ok((args, cur.advance())),
            _ => return Err(ParseError::expecting("Expected ',' or ')'", cur, &[",", ")"])),
        }
    }
}

fn parse_named_argument_value<'s>(
    cursor: Cursor<'s>,
) -> Result<ParseResult<'s, InlineExpression>, ParseError> {
    let start = cursor.pos();
    if !cursor.is_eof() && cursor.current() == '"' {
        let r = parse_string_literal(cursor)?;
        Ok(ParseResult::new(
            InlineExpression::StringLiteral { value: r.value, span: Some(Span::new(start, r.cursor.pos())) },
            r.cursor,
        ))
    } else if !cursor.is_eof() && (cursor.current() == '-' || cursor.current().is_ascii_digit()) {
        let r = parse_number(cursor)?;
        Ok(ParseResult::new(
            InlineExpression::NumberLiteral { raw: r.value.to_string(), span: Some(Span::new(start, r.cursor.pos())) },
            r.cursor,
        ))
    } else {
        Err(ParseError::expecting(
            "Named argument value must be a string or number literal",
            cursor,
            &["\"", "0-9"],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseContext;

    fn expr(src: &str) -> Expression {
        let mut ctx = ParseContext::new(100);
        parse_placeable(Cursor::new(src), &mut ctx).unwrap().value
    }

    #[test]
    fn variable_reference() {
        match expr("{ $name }") {
            Expression::Inline(InlineExpression::VariableReference { id, .. }) => {
                assert_eq!(id.name, "name");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negative_number_vs_term_reference() {
        match expr("{ -5 }") {
            Expression::Inline(InlineExpression::NumberLiteral { raw, .. }) => assert_eq!(raw, "-5"),
            other => panic!("unexpected {other:?}"),
        }
        match expr("{ -brand }") {
            Expression::Inline(InlineExpression::TermReference { id, .. }) => assert_eq!(id.name, "brand"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn function_reference_with_named_arg() {
        match expr(r#"{ NUMBER($x, minimumFractionDigits: 2) }"#) {
            Expression::Inline(InlineExpression::FunctionReference { id, arguments, .. }) => {
                assert_eq!(id.name, "NUMBER");
                assert_eq!(arguments.positional.len(), 1);
                assert_eq!(arguments.named.len(), 1);
                assert_eq!(arguments.named[0].name.name, "minimumFractionDigits");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn select_expression_exact_and_default() {
        let src = "{ $n ->\n    [0] zero\n   *[other] many\n}";
        match expr(src) {
            Expression::Select(sel) => {
                assert_eq!(sel.variants.len(), 2);
                assert!(sel.default_variant().is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn select_expression_requires_default() {
        let src = "{ $n ->\n    [0] zero\n    [1] one\n}";
        let mut ctx = ParseContext::new(100);
        assert!(parse_placeable(Cursor::new(src), &mut ctx).is_err());
    }
}
