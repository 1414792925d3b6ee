//! Minimal-fidelity FTL serializer.
//!
//! Spec.md §1 explicitly scopes two-way editing out: this crate never tries
//! to reproduce a source byte-for-byte. It only guarantees that serializing
//! a `Resource` produces FTL text that, re-parsed, carries the same
//! semantics — same messages, same attributes, same patterns. Comments are
//! round-tripped at their original level; `Junk` is re-emitted verbatim
//! since by definition it was never understood.

use std::fmt::Write as _;

use crate::ast::{
    CallArguments, Comment, CommentKind, Entry, Expression, InlineExpression, Message, Pattern,
    PatternElement, Resource, Term, Variant, VariantKey,
};

pub fn serialize(resource: &Resource) -> String {
    let mut out = String::new();
    for (i, entry) in resource.entries.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        serialize_entry(entry, &mut out);
    }
    out
}

fn serialize_entry(entry: &Entry, out: &mut String) {
    match entry {
        Entry::Message(m) => serialize_message(m, out),
        Entry::Term(t) => serialize_term(t, out),
        Entry::Comment(c) => serialize_comment(c, out),
        Entry::Junk(j) => {
            out.push_str(&j.content);
            if !j.content.ends_with('\n') {
                out.push('\n');
            }
        }
    }
}

fn comment_prefix(kind: &CommentKind) -> &'static str {
    match kind {
        CommentKind::Comment => "#",
        CommentKind::Group => "##",
        CommentKind::Resource => "###",
    }
}

fn serialize_comment(comment: &Comment, out: &mut String) {
    let prefix = comment_prefix(&comment.kind);
    if comment.content.is_empty() {
        let _ = writeln!(out, "{prefix}");
        return;
    }
    for line in comment.content.split('\n') {
        let _ = writeln!(out, "{prefix} {line}");
    }
}

fn serialize_message(message: &Message, out: &mut String) {
    if let Some(comment) = &message.comment {
        serialize_comment(comment, out);
    }
    let _ = write!(out, "{} =", message.id.name);
    if let Some(value) = &message.value {
        out.push(' ');
        serialize_pattern(value, out);
    }
    out.push('\n');
    for attr in &message.attributes {
        let _ = write!(out, "    .{} = ", attr.id.name);
        serialize_pattern(&attr.value, out);
        out.push('\n');
    }
}

fn serialize_term(term: &Term, out: &mut String) {
    if let Some(comment) = &term.comment {
        serialize_comment(comment, out);
    }
    let _ = write!(out, "-{} = ", term.id.name);
    serialize_pattern(&term.value, out);
    out.push('\n');
    for attr in &term.attributes {
        let _ = write!(out, "    .{} = ", attr.id.name);
        serialize_pattern(&attr.value, out);
        out.push('\n');
    }
}

/// Re-indents every continuation line in a pattern's text by four spaces,
/// the minimal amount the parser's common-indent stripping can always
/// recover losslessly, and re-emits placeables inline.
fn serialize_pattern(pattern: &Pattern, out: &mut String) {
    for element in &pattern.elements {
        match element {
            PatternElement::TextElement(text) => {
                let reindented = text.replace('\n', "\n    ");
                out.push_str(&reindented);
            }
            PatternElement::Placeable(expr) => {
                out.push('{');
                out.push(' ');
                serialize_expression(expr, out);
                out.push(' ');
                out.push('}');
            }
        }
    }
}

fn serialize_expression(expr: &Expression, out: &mut String) {
    match expr {
        Expression::Inline(inline) => serialize_inline(inline, out),
        Expression::Select(select) => {
            serialize_inline(&select.selector, out);
            out.push_str(" ->\n");
            for variant in &select.variants {
                serialize_variant(variant, out);
            }
            out.push_str("   ");
        }
    }
}

fn serialize_variant(variant: &Variant, out: &mut String) {
    let marker = if variant.default { "   *" } else { "    " };
    out.push_str(marker);
    out.push('[');
    match &variant.key {
        VariantKey::Identifier(id) => out.push_str(&id.name),
        VariantKey::NumberLiteral { raw, .. } => out.push_str(raw),
    }
    out.push_str("] ");
    serialize_pattern(&variant.value, out);
    out.push('\n');
}

fn serialize_inline(inline: &InlineExpression, out: &mut String) {
    match inline {
        InlineExpression::StringLiteral { value, .. } => {
            let _ = write!(out, "\"{}\"", escape_string(value));
        }
        InlineExpression::NumberLiteral { raw, .. } => out.push_str(raw),
        InlineExpression::VariableReference { id, .. } => {
            let _ = write!(out, "${}", id.name);
        }
        InlineExpression::MessageReference { id, attribute, .. } => {
            out.push_str(&id.name);
            if let Some(attr) = attribute {
                let _ = write!(out, ".{}", attr.name);
            }
        }
        InlineExpression::TermReference { id, attribute, arguments, .. } => {
            let _ = write!(out, "-{}", id.name);
            if let Some(attr) = attribute {
                let _ = write!(out, ".{}", attr.name);
            }
            if let Some(args) = arguments {
                serialize_call_arguments(args, out);
            }
        }
        InlineExpression::FunctionReference { id, arguments, .. } => {
            out.push_str(&id.name);
            serialize_call_arguments(arguments, out);
        }
        InlineExpression::Placeable { expression, .. } => {
            out.push('{');
            serialize_expression(expression, out);
            out.push('}');
        }
    }
}

fn serialize_call_arguments(args: &CallArguments, out: &mut String) {
    out.push('(');
    let mut first = true;
    for p in &args.positional {
        if !first {
            out.push_str(", ");
        }
        first = false;
        serialize_inline(p, out);
    }
    for n in &args.named {
        if !first {
            out.push_str(", ");
        }
        first = false;
        let _ = write!(out, "{}: ", n.name.name);
        serialize_inline(&n.value, out);
    }
    out.push(')');
}

fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn round_trip(src: &str) -> Resource {
        let first = parse(src);
        let serialized = serialize(&first);
        parse(&serialized)
    }

    #[test]
    fn simple_message_round_trips_semantically() {
        let reparsed = round_trip("hello = Hi, { $name }!\n");
        match &reparsed.entries[0] {
            Entry::Message(m) => {
                assert_eq!(m.id.name, "hello");
                assert!(m.value.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn select_expression_round_trips() {
        let src = "emails = { $count ->\n    [one] one email\n   *[other] { $count } emails\n}\n";
        let reparsed = round_trip(src);
        match &reparsed.entries[0] {
            Entry::Message(m) => {
                let value = m.value.as_ref().unwrap();
                let has_select = value
                    .elements
                    .iter()
                    .any(|e| matches!(e, PatternElement::Placeable(Expression::Select(_))));
                assert!(has_select);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn attributes_round_trip() {
        let src = "login =\n    .placeholder = you@example.com\n    .title = Log in\n";
        let reparsed = round_trip(src);
        match &reparsed.entries[0] {
            Entry::Message(m) => assert_eq!(m.attributes.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
