//! Resolves a parsed `Pattern`/`Message`/`Term` into a formatted string
//! (spec.md §4.7, §4.8).
//!
//! Resolution never fails outright: every error the reference raises
//! becomes a degraded fallback placeholder here instead, with the error
//! recorded alongside the output so callers can still inspect what went
//! wrong (spec.md §4.7 "formatting degrades, it does not fail"). Depth and
//! cycle tracking use a visited `(EntryKind, id)` set rather than a plain
//! counter so a cycle is caught exactly where it closes, the same resource
//! the syntax-level validator's `check_cycles` targets statically — this is
//! the runtime backstop for cycles a single bundle's static validation
//! can't see (cross-resource cycles formed after validation, for
//! instance).

use std::collections::{HashMap, HashSet};

use fluent_syntax::ast::{
    CallArguments, Expression, Identifier, InlineExpression, Message, NamedArgument, Pattern,
    PatternElement, SelectExpression, Term, Variant, VariantKey,
};

use crate::errors::ResolverError;
use crate::function::FunctionRegistry;
use crate::locale::{LocaleContext, NumberFormatOptions, NumberStyle};
use crate::types::{FluentNumber, FluentValue};

pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 100;

const FSI: char = '\u{2068}';
const PDI: char = '\u{2069}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EntryKind {
    Message,
    Term,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeKey(EntryKind, String);

/// Read-only lookup surface the resolver needs from a bundle: messages,
/// terms, and the function/locale machinery. `Bundle` implements the
/// borrows this needs directly; keeping the trait small lets tests resolve
/// against a bare `HashMap` without constructing a full `Bundle`.
pub trait MessageStore {
    fn get_message(&self, id: &str) -> Option<&Message>;
    fn get_term(&self, id: &str) -> Option<&Term>;
}

pub struct Scope<'a, S: MessageStore> {
    store: &'a S,
    functions: &'a FunctionRegistry,
    locale: &'a LocaleContext,
    args: &'a HashMap<String, FluentValue>,
    use_isolating: bool,
    visiting: HashSet<NodeKey>,
    depth: usize,
    max_depth: usize,
    pub errors: Vec<ResolverError>,
}

impl<'a, S: MessageStore> Scope<'a, S> {
    pub fn new(
        store: &'a S,
        functions: &'a FunctionRegistry,
        locale: &'a LocaleContext,
        args: &'a HashMap<String, FluentValue>,
        use_isolating: bool,
    ) -> Self {
        Scope {
            store,
            functions,
            locale,
            args,
            use_isolating,
            visiting: HashSet::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
            errors: Vec::new(),
        }
    }

    fn push_error(&mut self, err: ResolverError) {
        self.errors.push(err);
    }
}

/// Formats a message's value pattern. On a missing message or a
/// valueless message, returns the `{id}` fallback placeholder and records
/// the corresponding [`ResolverError`].
pub fn format_message<S: MessageStore>(scope: &mut Scope<'_, S>, id: &str) -> String {
    match scope.store.get_message(id) {
        Some(message) => match &message.value {
            Some(pattern) => resolve_pattern(scope, pattern),
            None => {
                scope.push_error(ResolverError::NoValue(id.to_string()));
                format!("{{{id}}}")
            }
        },
        None => {
            scope.push_error(ResolverError::UnknownMessage(id.to_string()));
            format!("{{{id}}}")
        }
    }
}

/// Formats a message attribute (`id.attribute`).
pub fn format_attribute<S: MessageStore>(scope: &mut Scope<'_, S>, id: &str, attribute: &str) -> String {
    match scope.store.get_message(id) {
        Some(message) => match message.attributes.iter().find(|a| a.id.name == attribute) {
            Some(attr) => resolve_pattern(scope, &attr.value),
            None => {
                scope.push_error(ResolverError::UnknownAttribute {
                    message: id.to_string(),
                    attribute: attribute.to_string(),
                });
                format!("{{{id}.{attribute}}}")
            }
        },
        None => {
            scope.push_error(ResolverError::UnknownMessage(id.to_string()));
            format!("{{{id}.{attribute}}}")
        }
    }
}

fn resolve_pattern<S: MessageStore>(scope: &mut Scope<'_, S>, pattern: &Pattern) -> String {
    let mut out = String::new();
    for element in &pattern.elements {
        match element {
            PatternElement::TextElement(text) => out.push_str(text),
            PatternElement::Placeable(expr) => out.push_str(&resolve_placeable(scope, expr)),
        }
    }
    out
}

fn resolve_placeable<S: MessageStore>(scope: &mut Scope<'_, S>, expr: &Expression) -> String {
    if scope.depth >= scope.max_depth {
        scope.push_error(ResolverError::TooDeep(scope.max_depth));
        return "{???}".to_string();
    }
    let value = resolve_expression(scope, expr);
    let text = display_value(&value);
    if scope.use_isolating && needs_isolation(expr) {
        format!("{FSI}{text}{PDI}")
    } else {
        text
    }
}

/// Bidi isolation wraps placeable *output*, not literal text already in the
/// pattern — wrapping a bare string literal would just be noise, so this
/// only isolates expressions whose value is computed (spec.md §4.7).
fn needs_isolation(expr: &Expression) -> bool {
    !matches!(expr, Expression::Inline(InlineExpression::StringLiteral { .. }))
}

fn resolve_expression<S: MessageStore>(scope: &mut Scope<'_, S>, expr: &Expression) -> FluentValue {
    match expr {
        Expression::Inline(inline) => resolve_inline(scope, inline),
        Expression::Select(select) => resolve_select(scope, select),
    }
}

fn resolve_select<S: MessageStore>(scope: &mut Scope<'_, S>, select: &SelectExpression) -> FluentValue {
    let selector = resolve_inline(scope, &select.selector);
    let variant = select_variant(scope, select, &selector);
    match variant {
        Some(v) => FluentValue::String(resolve_pattern(scope, &v.value)),
        None => {
            scope.push_error(ResolverError::NoDefaultVariant);
            FluentValue::String("{???}".to_string())
        }
    }
}

/// Exact-numeric match first, then CLDR plural category, then identifier
/// equality for non-numeric selectors (e.g. `$gender`); falls back to the
/// variant marked `default` (spec.md §4.8).
fn select_variant<'p, S: MessageStore>(
    scope: &Scope<'_, S>,
    select: &'p SelectExpression,
    selector: &FluentValue,
) -> Option<&'p Variant> {
    if let FluentValue::Number(n) = selector {
        let n_val = n.as_f64();
        for variant in &select.variants {
            if let VariantKey::NumberLiteral { raw, .. } = &variant.key {
                if raw.parse::<f64>().map(|v| v == n_val).unwrap_or(false) {
                    return Some(variant);
                }
            }
        }
        if !n_val.is_nan() {
            let category = scope.locale.plural_category(n_val);
            for variant in &select.variants {
                if let VariantKey::Identifier(id) = &variant.key {
                    if id.name == category {
                        return Some(variant);
                    }
                }
            }
        }
    } else if let FluentValue::String(s) = selector {
        for variant in &select.variants {
            if let VariantKey::Identifier(id) = &variant.key {
                if &id.name == s {
                    return Some(variant);
                }
            }
        }
    }
    select.default_variant()
}

fn resolve_inline<S: MessageStore>(scope: &mut Scope<'_, S>, inline: &InlineExpression) -> FluentValue {
    match inline {
        InlineExpression::StringLiteral { value, .. } => FluentValue::String(value.clone()),
        InlineExpression::NumberLiteral { raw, .. } => {
            FluentNumber::from_literal(raw).map(FluentValue::Number).unwrap_or(FluentValue::String(raw.clone()))
        }
        InlineExpression::VariableReference { id, .. } => match scope.args.get(&id.name) {
            Some(v) => v.clone(),
            None => {
                scope.push_error(ResolverError::MissingVariable(id.name.clone()));
                FluentValue::String(format!("{{${}}}", id.name))
            }
        },
        InlineExpression::MessageReference { id, attribute, .. } => {
            resolve_nested_message(scope, &id.name, attribute.as_ref())
        }
        InlineExpression::TermReference { id, attribute, arguments, .. } => {
            resolve_term_reference(scope, &id.name, attribute.as_ref(), arguments.as_ref())
        }
        InlineExpression::FunctionReference { id, arguments, .. } => {
            resolve_function_call(scope, &id.name, arguments)
        }
        InlineExpression::Placeable { expression, .. } => resolve_expression(scope, expression),
    }
}

fn resolve_nested_message<S: MessageStore>(
    scope: &mut Scope<'_, S>,
    id: &str,
    attribute: Option<&Identifier>,
) -> FluentValue {
    let key = NodeKey(EntryKind::Message, id.to_string());
    if scope.visiting.contains(&key) {
        scope.push_error(ResolverError::Cyclic(id.to_string()));
        return FluentValue::String(format!("{{{id}}}"));
    }
    let Some(message) = scope.store.get_message(id) else {
        scope.push_error(ResolverError::UnknownMessage(id.to_string()));
        return FluentValue::String(format!("{{{id}}}"));
    };
    let pattern = match attribute {
        Some(attr) => message.attributes.iter().find(|a| a.id.name == attr.name).map(|a| &a.value),
        None => message.value.as_ref(),
    };
    let Some(pattern) = pattern else {
        scope.push_error(ResolverError::NoValue(id.to_string()));
        return FluentValue::String(format!("{{{id}}}"));
    };
    scope.visiting.insert(key.clone());
    scope.depth += 1;
    let formatted = resolve_pattern(scope, pattern);
    scope.depth -= 1;
    scope.visiting.remove(&key);
    FluentValue::String(formatted)
}

/// Terms get a fresh local argument scope built entirely from the call
/// site's arguments — outer `$variables` are not visible inside a term,
/// matching the reference's term-call isolation (spec.md §4.8).
fn resolve_term_reference<S: MessageStore>(
    scope: &mut Scope<'_, S>,
    id: &str,
    attribute: Option<&Identifier>,
    arguments: Option<&CallArguments>,
) -> FluentValue {
    let key = NodeKey(EntryKind::Term, id.to_string());
    if scope.visiting.contains(&key) {
        scope.push_error(ResolverError::Cyclic(format!("-{id}")));
        return FluentValue::String(format!("{{-{id}}}"));
    }
    let Some(term) = scope.store.get_term(id) else {
        scope.push_error(ResolverError::UnknownTerm(id.to_string()));
        return FluentValue::String(format!("{{-{id}}}"));
    };
    let pattern = match attribute {
        Some(attr) => term.attributes.iter().find(|a| a.id.name == attr.name).map(|a| &a.value),
        None => Some(&term.value),
    };
    let Some(pattern) = pattern else {
        scope.push_error(ResolverError::UnknownAttribute {
            message: format!("-{id}"),
            attribute: attribute.map(|a| a.name.clone()).unwrap_or_default(),
        });
        return FluentValue::String(format!("{{-{id}}}"));
    };

    let mut local_args = HashMap::new();
    if let Some(args) = arguments {
        for (i, positional) in args.positional.iter().enumerate() {
            local_args.insert(i.to_string(), resolve_inline(scope, positional));
        }
        for named in &args.named {
            local_args.insert(named.name.name.clone(), resolve_named_value(&named.value));
        }
    }

    scope.visiting.insert(key.clone());
    scope.depth += 1;
    let outer_args = scope.args;
    // SAFETY-free approach: resolve with a temporary scope borrowing the
    // same store/functions/locale but the term's own local args.
    let result = {
        let mut inner = Scope {
            store: scope.store,
            functions: scope.functions,
            locale: scope.locale,
            args: &local_args,
            use_isolating: scope.use_isolating,
            visiting: std::mem::take(&mut scope.visiting),
            depth: scope.depth,
            max_depth: scope.max_depth,
            errors: Vec::new(),
        };
        let formatted = resolve_pattern(&mut inner, pattern);
        scope.visiting = inner.visiting;
        scope.errors.append(&mut inner.errors);
        formatted
    };
    let _ = outer_args;
    scope.depth -= 1;
    scope.visiting.remove(&key);
    FluentValue::String(result)
}

/// Named-argument literals never reference outer `$variables` (only
/// `VariableReference`s inside *positional* slots of a call do, and even
/// those resolve in the *caller's* scope before crossing into the term) —
/// per spec.md §4.8, so this needs no `Scope` at all.
fn resolve_named_value(value: &InlineExpression) -> FluentValue {
    match value {
        InlineExpression::StringLiteral { value, .. } => FluentValue::String(value.clone()),
        InlineExpression::NumberLiteral { raw, .. } => {
            FluentNumber::from_literal(raw).map(FluentValue::Number).unwrap_or(FluentValue::String(raw.clone()))
        }
        _ => FluentValue::String(String::new()),
    }
}

fn resolve_function_call<S: MessageStore>(
    scope: &mut Scope<'_, S>,
    name: &str,
    arguments: &CallArguments,
) -> FluentValue {
    let positional: Vec<FluentValue> =
        arguments.positional.iter().map(|p| resolve_inline(scope, p)).collect();
    let named: HashMap<String, FluentValue> =
        arguments.named.iter().map(|n| (n.name.name.clone(), resolve_named_value(&n.value))).collect();

    if let Some(builtin) = resolve_builtin(scope, name, &positional, &named) {
        return builtin;
    }

    if !scope.functions.contains(name) {
        scope.push_error(ResolverError::UnknownFunction(name.to_string()));
        return FluentValue::String(format!("{{!{name}}}"));
    }
    match scope.functions.call(name, &positional, &named) {
        Ok(v) => v,
        Err(e) => {
            scope.push_error(e);
            FluentValue::String(format!("{{!{name}}}"))
        }
    }
}

/// `NUMBER`, `DATETIME`, and `CURRENCY` are resolved directly against the
/// active `LocaleContext` rather than going through the general-purpose
/// registry, mirroring the reference's built-in dispatch fast path
/// (spec.md §4.6).
fn resolve_builtin<S: MessageStore>(
    scope: &Scope<'_, S>,
    name: &str,
    positional: &[FluentValue],
    named: &HashMap<String, FluentValue>,
) -> Option<FluentValue> {
    match name {
        "NUMBER" => {
            let n = positional.first()?.as_number()?.as_f64();
            let mut opts = NumberFormatOptions::default();
            if let Some(FluentValue::String(style)) = named.get("style") {
                opts.style = match style.as_str() {
                    "percent" => NumberStyle::Percent,
                    "currency" => NumberStyle::Currency,
                    _ => NumberStyle::Decimal,
                };
            }
            if let Some(FluentValue::String(code)) = named.get("currency") {
                opts.currency = Some(code.clone());
            }
            if let Some(v) = named.get("minimumFractionDigits").and_then(|v| v.as_number()) {
                opts.minimum_fraction_digits = Some(v.as_f64() as usize);
            }
            if let Some(v) = named.get("maximumFractionDigits").and_then(|v| v.as_number()) {
                opts.maximum_fraction_digits = Some(v.as_f64() as usize);
            }
            if let Some(FluentValue::String(s)) = named.get("useGrouping") {
                opts.use_grouping = s != "false";
            }
            Some(FluentValue::String(scope.locale.format_number(n, &opts)))
        }
        "DATETIME" => {
            let dt = match positional.first()? {
                FluentValue::DateTime(dt) => *dt,
                _ => return Some(FluentValue::String("{???}".to_string())),
            };
            let pattern = named.get("pattern").and_then(|v| v.as_str()).map(str::to_string);
            Some(FluentValue::String(scope.locale.format_datetime(&dt, pattern.as_deref())))
        }
        "CURRENCY" => {
            let n = positional.first()?.as_number()?.as_f64();
            let mut opts = NumberFormatOptions {
                style: NumberStyle::Currency,
                minimum_fraction_digits: Some(2),
                maximum_fraction_digits: Some(2),
                ..Default::default()
            };
            if let Some(FluentValue::String(code)) = named.get("currency") {
                opts.currency = Some(code.clone());
            }
            Some(FluentValue::String(scope.locale.format_number(n, &opts)))
        }
        _ => None,
    }
}

fn display_value(value: &FluentValue) -> String {
    match value {
        FluentValue::None => "{???}".to_string(),
        FluentValue::String(s) => s.clone(),
        FluentValue::Number(n) => n.to_string(),
        FluentValue::DateTime(dt) => dt.to_rfc3339(),
        FluentValue::Seq(items) => items.iter().map(display_value).collect::<Vec<_>>().join(", "),
        FluentValue::Map(_) => "{???}".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluent_syntax::ast::{Entry, Resource};
    use fluent_syntax::parser::parse;

    struct TestStore {
        messages: HashMap<String, Message>,
        terms: HashMap<String, Term>,
    }

    impl TestStore {
        fn from_source(src: &'static str) -> Self {
            let resource: Resource = parse(src);
            let mut messages = HashMap::new();
            let mut terms = HashMap::new();
            for entry in resource.entries {
                match entry {
                    Entry::Message(m) => {
                        messages.insert(m.id.name.clone(), m);
                    }
                    Entry::Term(t) => {
                        terms.insert(t.id.name.clone(), t);
                    }
                    _ => {}
                }
            }
            TestStore { messages, terms }
        }
    }

    impl MessageStore for TestStore {
        fn get_message(&self, id: &str) -> Option<&Message> {
            self.messages.get(id)
        }
        fn get_term(&self, id: &str) -> Option<&Term> {
            self.terms.get(id)
        }
    }

    fn resolve(src: &'static str, id: &str, args: &HashMap<String, FluentValue>) -> (String, Vec<ResolverError>) {
        let store = TestStore::from_source(src);
        let functions = FunctionRegistry::new();
        let locale = LocaleContext::new("en-US").unwrap();
        let mut scope = Scope::new(&store, &functions, &locale, args, false);
        let out = format_message(&mut scope, id);
        (out, scope.errors)
    }

    #[test]
    fn missing_variable_falls_back_to_dollar_name() {
        let (out, errs) = resolve("hello = Hi, { $name }!\n", "hello", &HashMap::new());
        assert_eq!(out, "Hi, {$name}!");
        assert!(matches!(errs[0], ResolverError::MissingVariable(ref n) if n == "name"));
    }

    #[test]
    fn exact_numeric_variant_wins_over_plural_category() {
        let src = "emails = { $n ->\n    [1] exactly one\n    [one] plural one\n   *[other] many\n}\n";
        let mut args = HashMap::new();
        args.insert("n".to_string(), FluentValue::Number(FluentNumber::Int(1)));
        let (out, _) = resolve(src, "emails", &args);
        assert_eq!(out, "exactly one");
    }

    #[test]
    fn plural_category_used_when_no_exact_match() {
        let src = "emails = { $n ->\n    [one] one email\n   *[other] { $n } emails\n}\n";
        let mut args = HashMap::new();
        args.insert("n".to_string(), FluentValue::Number(FluentNumber::Int(5)));
        let (out, _) = resolve(src, "emails", &args);
        assert_eq!(out, "5 emails");
    }

    #[test]
    fn self_referencing_message_degrades_instead_of_hanging() {
        let (out, errs) = resolve("loop = { loop }\n", "loop", &HashMap::new());
        assert_eq!(out, "{loop}");
        assert!(matches!(errs[0], ResolverError::Cyclic(ref n) if n == "loop"));
    }

    #[test]
    fn term_call_does_not_see_outer_variables() {
        let src = "-brand = { $name ->\n   *[other] Brand\n}\ngreeting = { -brand }\n";
        let mut args = HashMap::new();
        args.insert("name".to_string(), FluentValue::String("ignored".to_string()));
        let (out, _) = resolve(src, "greeting", &args);
        assert_eq!(out, "Brand");
    }

    #[test]
    fn unknown_message_reference_degrades_to_brace_id() {
        let (out, errs) = resolve("a = { missing }\n", "a", &HashMap::new());
        assert_eq!(out, "{missing}");
        assert!(matches!(errs[0], ResolverError::UnknownMessage(ref n) if n == "missing"));
    }
}
