//! Static analysis over a single `Message`/`Term`: which variables it
//! reads, which functions it calls, which other messages/terms it
//! references, and whether it contains a select expression (spec.md §4.5).
//!
//! This is a read-only pass; it never mutates the AST and never needs a
//! locale or argument map. `fluent-bundle::introspection_cache` wraps this
//! with an AST-identity cache and documents the best-effort coherence
//! contract under concurrent bundle mutation — that part is a `Bundle`
//! concern, not a syntax concern.

use std::collections::BTreeSet;

use crate::ast::{
    CallArguments, Expression, InlineExpression, Message, Pattern, SelectExpression, Term,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReferenceKind {
    Message,
    Term,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReferenceInfo {
    pub kind: ReferenceKind,
    pub id: String,
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageInfo {
    pub variables: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    pub references: BTreeSet<ReferenceInfo>,
    pub has_select: bool,
}

pub fn introspect_message(message: &Message) -> MessageInfo {
    let mut info = MessageInfo::default();
    if let Some(value) = &message.value {
        visit_pattern(value, &mut info);
    }
    for attr in &message.attributes {
        visit_pattern(&attr.value, &mut info);
    }
    info
}

pub fn introspect_term(term: &Term) -> MessageInfo {
    let mut info = MessageInfo::default();
    visit_pattern(&term.value, &mut info);
    for attr in &term.attributes {
        visit_pattern(&attr.value, &mut info);
    }
    info
}

fn visit_pattern(pattern: &Pattern, info: &mut MessageInfo) {
    for el in &pattern.elements {
        if let crate::ast::PatternElement::Placeable(expr) = el {
            visit_expression(expr, info);
        }
    }
}

fn visit_expression(expr: &Expression, info: &mut MessageInfo) {
    match expr {
        Expression::Inline(inline) => visit_inline(inline, info),
        Expression::Select(select) => visit_select(select, info),
    }
}

fn visit_select(select: &SelectExpression, info: &mut MessageInfo) {
    info.has_select = true;
    visit_inline(&select.selector, info);
    for variant in &select.variants {
        visit_pattern(&variant.value, info);
    }
}

fn visit_inline(inline: &InlineExpression, info: &mut MessageInfo) {
    match inline {
        InlineExpression::StringLiteral { .. } | InlineExpression::NumberLiteral { .. } => {}
        InlineExpression::VariableReference { id, .. } => {
            info.variables.insert(id.name.clone());
        }
        InlineExpression::MessageReference { id, attribute, .. } => {
            info.references.insert(ReferenceInfo {
                kind: ReferenceKind::Message,
                id: id.name.clone(),
                attribute: attribute.as_ref().map(|a| a.name.clone()),
            });
        }
        InlineExpression::TermReference { id, attribute, arguments, .. } => {
            info.references.insert(ReferenceInfo {
                kind: ReferenceKind::Term,
                id: id.name.clone(),
                attribute: attribute.as_ref().map(|a| a.name.clone()),
            });
            if let Some(args) = arguments {
                visit_call_arguments(args, info);
            }
        }
        InlineExpression::FunctionReference { id, arguments, .. } => {
            info.functions.insert(id.name.clone());
            visit_call_arguments(arguments, info);
        }
        InlineExpression::Placeable { expression, .. } => visit_expression(expression, info),
    }
}

fn visit_call_arguments(args: &CallArguments, info: &mut MessageInfo) {
    for p in &args.positional {
        visit_inline(p, info);
    }
    for n in &args.named {
        visit_inline(&n.value, info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::ast::Entry;

    fn message_info(src: &str) -> MessageInfo {
        let resource = parse(src);
        match &resource.entries[0] {
            Entry::Message(m) => introspect_message(m),
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn collects_variables_through_nested_calls() {
        let info = message_info(
            "foo = { NUMBER($count, minimumFractionDigits: $digits) } { $a ->\n    [1] { $b }\n   *[other] { $c }\n}\n",
        );
        for var in ["count", "digits", "a", "b", "c"] {
            assert!(info.variables.contains(var), "missing {var}");
        }
    }

    #[test]
    fn detects_select_flag() {
        let with_select = message_info("foo = { $n ->\n   *[other] x\n}\n");
        assert!(with_select.has_select);
        let without = message_info("foo = plain text\n");
        assert!(!without.has_select);
    }

    #[test]
    fn collects_function_and_reference_names() {
        let info = message_info("foo = { bar } { -baz.attr } { FUN() }\n");
        assert!(info.functions.contains("FUN"));
        assert!(info
            .references
            .iter()
            .any(|r| r.kind == ReferenceKind::Message && r.id == "bar"));
        assert!(info
            .references
            .iter()
            .any(|r| r.kind == ReferenceKind::Term && r.id == "baz" && r.attribute.as_deref() == Some("attr")));
    }
}
