//! Semantic validation over a parsed [`Resource`].
//!
//! Catches spec-level errors the parser cannot (or, for defensive checks,
//! deliberately does not) reject on its own: duplicate attributes, duplicate
//! named arguments, selects built by hand without a default variant,
//! reference cycles, cross-resource shadowing, and undefined references.
//! None of this mutates the AST; it only produces diagnostics alongside it.

use std::collections::{HashMap, HashSet};

use crate::ast::{
    CallArguments, Entry, Expression, InlineExpression, Pattern, Resource, SelectExpression,
};
use crate::diagnostics::{DiagnosticCode, LineOffsetCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub context: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationResult {
    fn push(&mut self, d: Diagnostic) {
        if d.severity == Severity::Error {
            self.is_valid = false;
            self.errors.push(d);
        } else {
            self.warnings.push(d);
        }
    }
}

/// Which id-namespace a reference or definition belongs to. Messages and
/// terms live in separate namespaces in Fluent (a message and a term may
/// share a name) but the validator's dependency graph unifies them into one
/// node space tagged by kind, so cross-type cycles (message -> term ->
/// message) are caught by a single SCC pass (spec.md §4.9 Design Notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EntryKind {
    Message,
    Term,
}

type NodeKey = (EntryKind, String);

/// Reference chains longer than this are flagged even when acyclic — an
/// unbounded reference chain is as much a resolver-depth risk as a cycle.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 50;

/// Runs every check in spec.md §4.4 over `resource`. `known_message_ids` and
/// `known_term_ids` are the ids already registered from prior resources in
/// the same bundle (for shadow-warning and undefined-reference checks);
/// pass empty sets when validating a resource in isolation.
pub fn validate(
    resource: &Resource,
    known_message_ids: &HashSet<String>,
    known_term_ids: &HashSet<String>,
    line_cache: &LineOffsetCache,
) -> ValidationResult {
    validate_with_depth(
        resource,
        known_message_ids,
        known_term_ids,
        line_cache,
        DEFAULT_MAX_CHAIN_DEPTH,
    )
}

pub fn validate_with_depth(
    resource: &Resource,
    known_message_ids: &HashSet<String>,
    known_term_ids: &HashSet<String>,
    line_cache: &LineOffsetCache,
    max_chain_depth: usize,
) -> ValidationResult {
    let mut result = ValidationResult { is_valid: true, errors: Vec::new(), warnings: Vec::new() };

    let mut local_message_ids = HashSet::new();
    let mut local_term_ids = HashSet::new();
    let mut graph: HashMap<NodeKey, Vec<NodeKey>> = HashMap::new();

    for entry in &resource.entries {
        match entry {
            Entry::Message(m) => {
                local_message_ids.insert(m.id.name.clone());
                if known_message_ids.contains(&m.id.name) {
                    push_span(
                        &mut result,
                        line_cache,
                        DiagnosticCode::W5006ShadowedEntry,
                        format!("message `{}` shadows a message from a previous resource", m.id.name),
                        m.id.name.clone(),
                        m.span,
                        Severity::Warning,
                    );
                }
                check_duplicate_attributes(&mut result, line_cache, &m.id.name, &m.attributes);
                let mut refs = Vec::new();
                if let Some(v) = &m.value {
                    walk_pattern(v, &mut |e| {
                        check_call_arguments_on_expr(&mut result, line_cache, &m.id.name, e);
                        collect_ref(e, &mut refs);
                    });
                }
                for a in &m.attributes {
                    walk_pattern(&a.value, &mut |e| {
                        check_call_arguments_on_expr(&mut result, line_cache, &m.id.name, e);
                        collect_ref(e, &mut refs);
                    });
                }
                graph.insert((EntryKind::Message, m.id.name.clone()), refs);
            }
            Entry::Term(t) => {
                local_term_ids.insert(t.id.name.clone());
                if known_term_ids.contains(&t.id.name) {
                    push_span(
                        &mut result,
                        line_cache,
                        DiagnosticCode::W5006ShadowedEntry,
                        format!("term `-{}` shadows a term from a previous resource", t.id.name),
                        t.id.name.clone(),
                        t.span,
                        Severity::Warning,
                    );
                }
                check_duplicate_attributes(&mut result, line_cache, &t.id.name, &t.attributes);
                let mut refs = Vec::new();
                walk_pattern(&t.value, &mut |e| {
                    check_call_arguments_on_expr(&mut result, line_cache, &t.id.name, e);
                    collect_ref(e, &mut refs);
                });
                for a in &t.attributes {
                    walk_pattern(&a.value, &mut |e| {
                        check_call_arguments_on_expr(&mut result, line_cache, &t.id.name, e);
                        collect_ref(e, &mut refs);
                    });
                }
                graph.insert((EntryKind::Term, t.id.name.clone()), refs);
            }
            Entry::Comment(_) | Entry::Junk(_) => {}
        }
    }

    check_undefined_references(
        &mut result,
        &graph,
        &local_message_ids,
        &local_term_ids,
        known_message_ids,
        known_term_ids,
    );
    check_select_shape(resource, &mut result, line_cache);
    check_cycles(&graph, &mut result);
    check_chain_depth(&graph, max_chain_depth, &mut result);

    result
}

fn push_span(
    result: &mut ValidationResult,
    line_cache: &LineOffsetCache,
    code: DiagnosticCode,
    message: String,
    context: String,
    span: Option<crate::ast::Span>,
    severity: Severity,
) {
    let (line, column) = match span {
        Some(s) => {
            let (l, c) = line_cache.line_col(s.start);
            (Some(l), Some(c))
        }
        None => (None, None),
    };
    result.push(Diagnostic { code, message, context, line, column, severity });
}

fn check_duplicate_attributes(
    result: &mut ValidationResult,
    line_cache: &LineOffsetCache,
    owner: &str,
    attributes: &[crate::ast::Attribute],
) {
    let mut seen = HashSet::new();
    for attr in attributes {
        if !seen.insert(attr.id.name.clone()) {
            push_span(
                result,
                line_cache,
                DiagnosticCode::W5001DuplicateAttribute,
                format!("duplicate attribute `.{}` on `{owner}`", attr.id.name),
                owner.to_string(),
                attr.span,
                Severity::Warning,
            );
        }
    }
}

fn check_call_arguments_on_expr(
    result: &mut ValidationResult,
    line_cache: &LineOffsetCache,
    owner: &str,
    expr: &InlineExpression,
) {
    let args: Option<&CallArguments> = match expr {
        InlineExpression::TermReference { arguments: Some(a), .. } => Some(a),
        InlineExpression::FunctionReference { arguments, .. } => Some(arguments),
        _ => return,
    };
    let Some(args) = args else { return };
    let mut seen = HashSet::new();
    for named in &args.named {
        if !seen.insert(named.name.name.clone()) {
            push_span(
                result,
                line_cache,
                DiagnosticCode::E5002DuplicateNamedArgument,
                format!("duplicate named argument `{}` in call within `{owner}`", named.name.name),
                owner.to_string(),
                named.span,
                Severity::Error,
            );
        }
    }
}

/// Defensive check for `SelectExpression`s that didn't come through the
/// parser (e.g. constructed directly in tests): the parser itself refuses
/// to ever produce one without variants or without exactly one default.
fn check_select_shape(resource: &Resource, result: &mut ValidationResult, line_cache: &LineOffsetCache) {
    for entry in &resource.entries {
        let (owner, patterns): (&str, Vec<&Pattern>) = match entry {
            Entry::Message(m) => {
                let mut ps: Vec<&Pattern> = m.value.iter().collect();
                ps.extend(m.attributes.iter().map(|a| &a.value));
                (&m.id.name, ps)
            }
            Entry::Term(t) => {
                let mut ps: Vec<&Pattern> = vec![&t.value];
                ps.extend(t.attributes.iter().map(|a| &a.value));
                (&t.id.name, ps)
            }
            _ => continue,
        };
        for pattern in patterns {
            walk_selects(pattern, &mut |sel| check_one_select(sel, owner, result, line_cache));
        }
    }
}

fn check_one_select(
    sel: &SelectExpression,
    owner: &str,
    result: &mut ValidationResult,
    line_cache: &LineOffsetCache,
) {
    if sel.variants.is_empty() {
        push_span(
            result,
            line_cache,
            DiagnosticCode::E5003SelectWithoutVariants,
            format!("select expression in `{owner}` has no variants"),
            owner.to_string(),
            sel.span,
            Severity::Error,
        );
    } else if sel.default_variant().is_none() {
        push_span(
            result,
            line_cache,
            DiagnosticCode::E5004SelectWithoutDefault,
            format!("select expression in `{owner}` has no default variant"),
            owner.to_string(),
            sel.span,
            Severity::Error,
        );
    }
}

fn walk_selects<'a>(pattern: &'a Pattern, f: &mut impl FnMut(&'a SelectExpression)) {
    for el in &pattern.elements {
        if let crate::ast::PatternElement::Placeable(expr) = el {
            walk_expression_selects(expr, f);
        }
    }
}

fn walk_expression_selects<'a>(expr: &'a Expression, f: &mut impl FnMut(&'a SelectExpression)) {
    match expr {
        Expression::Select(sel) => {
            f(sel);
            for v in &sel.variants {
                walk_selects(&v.value, f);
            }
        }
        Expression::Inline(inline) => walk_inline_selects(inline, f),
    }
}

fn walk_inline_selects<'a>(inline: &'a InlineExpression, f: &mut impl FnMut(&'a SelectExpression)) {
    match inline {
        InlineExpression::Placeable { expression, .. } => walk_expression_selects(expression, f),
        InlineExpression::TermReference { arguments: Some(args), .. } => {
            for p in &args.positional {
                walk_inline_selects(p, f);
            }
        }
        InlineExpression::FunctionReference { arguments, .. } => {
            for p in &arguments.positional {
                walk_inline_selects(p, f);
            }
        }
        _ => {}
    }
}

/// Invokes `f` on every `InlineExpression` in `pattern`, including those
/// nested inside select selectors/variants, call arguments, and nested
/// placeables (spec.md §4.5 "recursively visits every InlineExpression").
fn walk_pattern<'a>(pattern: &'a Pattern, f: &mut impl FnMut(&'a InlineExpression)) {
    for el in &pattern.elements {
        if let crate::ast::PatternElement::Placeable(expr) = el {
            walk_expression(expr, f);
        }
    }
}

fn walk_expression<'a>(expr: &'a Expression, f: &mut impl FnMut(&'a InlineExpression)) {
    match expr {
        Expression::Inline(inline) => walk_inline(inline, f),
        Expression::Select(sel) => {
            walk_inline(&sel.selector, f);
            for v in &sel.variants {
                walk_pattern(&v.value, f);
            }
        }
    }
}

fn walk_inline<'a>(inline: &'a InlineExpression, f: &mut impl FnMut(&'a InlineExpression)) {
    f(inline);
    match inline {
        InlineExpression::Placeable { expression, .. } => walk_expression(expression, f),
        InlineExpression::TermReference { arguments: Some(args), .. } => walk_call_args(args, f),
        InlineExpression::FunctionReference { arguments, .. } => walk_call_args(arguments, f),
        _ => {}
    }
}

fn walk_call_args<'a>(args: &'a CallArguments, f: &mut impl FnMut(&'a InlineExpression)) {
    for p in &args.positional {
        walk_inline(p, f);
    }
    for n in &args.named {
        walk_inline(&n.value, f);
    }
}

fn collect_ref(expr: &InlineExpression, out: &mut Vec<NodeKey>) {
    match expr {
        InlineExpression::MessageReference { id, .. } => out.push((EntryKind::Message, id.name.clone())),
        InlineExpression::TermReference { id, .. } => out.push((EntryKind::Term, id.name.clone())),
        _ => {}
    }
}

fn check_undefined_references(
    result: &mut ValidationResult,
    graph: &HashMap<NodeKey, Vec<NodeKey>>,
    local_messages: &HashSet<String>,
    local_terms: &HashSet<String>,
    known_messages: &HashSet<String>,
    known_terms: &HashSet<String>,
) {
    for ((kind, owner), refs) in graph {
        let owner_label = match kind {
            EntryKind::Message => owner.clone(),
            EntryKind::Term => format!("-{owner}"),
        };
        for (ref_kind, ref_id) in refs {
            let defined = match ref_kind {
                EntryKind::Message => local_messages.contains(ref_id) || known_messages.contains(ref_id),
                EntryKind::Term => local_terms.contains(ref_id) || known_terms.contains(ref_id),
            };
            if !defined {
                let label = match ref_kind {
                    EntryKind::Message => ref_id.clone(),
                    EntryKind::Term => format!("-{ref_id}"),
                };
                result.push(Diagnostic {
                    code: DiagnosticCode::W5007UndefinedReference,
                    message: format!("`{owner_label}` references undefined `{label}`"),
                    context: owner_label.clone(),
                    line: None,
                    column: None,
                    severity: Severity::Warning,
                });
            }
        }
    }
}

/// Tarjan's strongly-connected-components algorithm over the reference
/// graph, reporting a warning for every SCC of size >= 2 and for every
/// self-reference (spec.md §4.4). The graph is small (bounded by resource
/// entry count, not by adversarial input), so plain recursion is acceptable
/// here — unlike the parser, which bounds its own recursion against
/// attacker-controlled nesting.
fn check_cycles(graph: &HashMap<NodeKey, Vec<NodeKey>>, result: &mut ValidationResult) {
    struct Tarjan<'g> {
        graph: &'g HashMap<NodeKey, Vec<NodeKey>>,
        index: HashMap<NodeKey, usize>,
        low_link: HashMap<NodeKey, usize>,
        on_stack: HashSet<NodeKey>,
        stack: Vec<NodeKey>,
        counter: usize,
        sccs: Vec<Vec<NodeKey>>,
    }

    impl<'g> Tarjan<'g> {
        fn strong_connect(&mut self, v: &NodeKey) {
            self.index.insert(v.clone(), self.counter);
            self.low_link.insert(v.clone(), self.counter);
            self.counter += 1;
            self.stack.push(v.clone());
            self.on_stack.insert(v.clone());

            if let Some(neighbors) = self.graph.get(v) {
                for w in neighbors {
                    if !self.graph.contains_key(w) {
                        continue;
                    }
                    if !self.index.contains_key(w) {
                        self.strong_connect(w);
                        let w_low = self.low_link[w];
                        let v_low = self.low_link[v];
                        self.low_link.insert(v.clone(), v_low.min(w_low));
                    } else if self.on_stack.contains(w) {
                        let w_idx = self.index[w];
                        let v_low = self.low_link[v];
                        self.low_link.insert(v.clone(), v_low.min(w_idx));
                    }
                }
            }

            if self.low_link[v] == self.index[v] {
                let mut scc = Vec::new();
                loop {
                    let w = self.stack.pop().expect("stack non-empty while unwinding SCC");
                    self.on_stack.remove(&w);
                    let is_v = &w == v;
                    scc.push(w);
                    if is_v {
                        break;
                    }
                }
                self.sccs.push(scc);
            }
        }
    }

    let mut tarjan = Tarjan {
        graph,
        index: HashMap::new(),
        low_link: HashMap::new(),
        on_stack: HashSet::new(),
        stack: Vec::new(),
        counter: 0,
        sccs: Vec::new(),
    };
    for node in graph.keys() {
        if !tarjan.index.contains_key(node) {
            tarjan.strong_connect(&node.clone());
        }
    }

    for scc in &tarjan.sccs {
        let self_loop = scc.len() == 1
            && graph
                .get(&scc[0])
                .is_some_and(|refs| refs.contains(&scc[0]));
        if scc.len() >= 2 || self_loop {
            let names: Vec<String> = scc
                .iter()
                .map(|(kind, id)| match kind {
                    EntryKind::Message => id.clone(),
                    EntryKind::Term => format!("-{id}"),
                })
                .collect();
            result.push(Diagnostic {
                code: DiagnosticCode::W5005CircularReference,
                message: format!("circular reference among: {}", names.join(", ")),
                context: names.join(", "),
                line: None,
                column: None,
                severity: Severity::Warning,
            });
        }
    }
}

/// Longest acyclic reference chain from each node, memoized. Nodes that
/// participate in a cycle are skipped here (already reported by
/// [`check_cycles`]); this only flags long but acyclic chains, which risk
/// tripping the resolver's `MAX_DEPTH` (spec.md §4.8) even without looping.
fn check_chain_depth(
    graph: &HashMap<NodeKey, Vec<NodeKey>>,
    max_chain_depth: usize,
    result: &mut ValidationResult,
) {
    fn depth_of(
        node: &NodeKey,
        graph: &HashMap<NodeKey, Vec<NodeKey>>,
        memo: &mut HashMap<NodeKey, usize>,
        visiting: &mut HashSet<NodeKey>,
    ) -> usize {
        if let Some(&d) = memo.get(node) {
            return d;
        }
        if !visiting.insert(node.clone()) {
            return 0; // part of a cycle; already reported separately.
        }
        let mut max_child = 0;
        if let Some(children) = graph.get(node) {
            for child in children {
                if graph.contains_key(child) {
                    max_child = max_child.max(depth_of(child, graph, memo, visiting));
                }
            }
        }
        visiting.remove(node);
        let depth = max_child + 1;
        memo.insert(node.clone(), depth);
        depth
    }

    let mut memo = HashMap::new();
    for node in graph.keys() {
        let mut visiting = HashSet::new();
        let depth = depth_of(node, graph, &mut memo, &mut visiting);
        if depth > max_chain_depth {
            let (kind, id) = node;
            let label = match kind {
                EntryKind::Message => id.clone(),
                EntryKind::Term => format!("-{id}"),
            };
            result.push(Diagnostic {
                code: DiagnosticCode::W5005CircularReference,
                message: format!(
                    "reference chain from `{label}` exceeds depth bound ({max_chain_depth})"
                ),
                context: label,
                line: None,
                column: None,
                severity: Severity::Warning,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn validate_src(src: &str) -> ValidationResult {
        let resource = parse(src);
        let cache = LineOffsetCache::new(src);
        validate(&resource, &HashSet::new(), &HashSet::new(), &cache)
    }

    #[test]
    fn duplicate_attribute_warns() {
        let src = "foo =\n    .attr = one\n    .attr = two\n";
        let r = validate_src(src);
        assert!(r.warnings.iter().any(|d| d.code == DiagnosticCode::W5001DuplicateAttribute));
        assert!(r.is_valid);
    }

    #[test]
    fn duplicate_named_argument_errors() {
        let src = "foo = { FUN(x: 1, x: 2) }\n";
        let r = validate_src(src);
        assert!(!r.is_valid);
        assert!(r.errors.iter().any(|d| d.code == DiagnosticCode::E5002DuplicateNamedArgument));
    }

    #[test]
    fn self_reference_cycle_warns() {
        let src = "foo = a { foo } b\n";
        let r = validate_src(src);
        assert!(r.warnings.iter().any(|d| d.code == DiagnosticCode::W5005CircularReference));
    }

    #[test]
    fn mutual_cycle_across_message_and_term() {
        let src = "a = { -b }\n-b = { a }\n";
        let r = validate_src(src);
        assert!(r.warnings.iter().any(|d| d.code == DiagnosticCode::W5005CircularReference));
    }

    #[test]
    fn undefined_reference_warns() {
        let src = "foo = { missing }\n";
        let r = validate_src(src);
        assert!(r.warnings.iter().any(|d| d.code == DiagnosticCode::W5007UndefinedReference));
    }

    #[test]
    fn shadowing_against_known_ids_warns() {
        let src = "foo = bar\n";
        let resource = parse(src);
        let cache = LineOffsetCache::new(src);
        let mut known = HashSet::new();
        known.insert("foo".to_string());
        let r = validate(&resource, &known, &HashSet::new(), &cache);
        assert!(r.warnings.iter().any(|d| d.code == DiagnosticCode::W5006ShadowedEntry));
    }
}
