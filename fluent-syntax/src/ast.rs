//! The Fluent AST: an immutable tree of entries, patterns, and expressions.
//!
//! Nodes are built once by the parser and never mutated afterwards; a
//! `Bundle` (in `fluent-bundle`) owns the `Resource` for the lifetime of the
//! messages it registers. Spans are optional (`None` for nodes synthesized
//! outside the parser, e.g. in tests) and are byte offsets into the
//! normalized (LF-only) source.

/// Byte-offset span `[start, end)` into normalized source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub span: Option<Span>,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Identifier { name: name.into(), span: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommentKind {
    /// `#` — attaches to the following message/term if there is no blank
    /// line between them.
    Comment,
    /// `##` — stands alone, documents a group of entries.
    Group,
    /// `###` — stands alone, documents the whole resource.
    Resource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub content: String,
    pub kind: CommentKind,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub id: Identifier,
    pub value: Pattern,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Identifier,
    pub value: Option<Pattern>,
    pub attributes: Vec<Attribute>,
    pub comment: Option<Comment>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub id: Identifier,
    pub value: Pattern,
    pub attributes: Vec<Attribute>,
    pub comment: Option<Comment>,
    pub span: Option<Span>,
}

/// A region of input that failed to parse as any known entry. The parser
/// always recovers to the next plausible entry start; every byte of input is
/// accounted for by exactly one `Entry` (Message, Term, Comment, or Junk).
#[derive(Debug, Clone, PartialEq)]
pub struct Junk {
    pub content: String,
    pub annotations: Vec<Annotation>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub code: crate::diagnostics::DiagnosticCode,
    pub message: String,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Message(Message),
    Term(Term),
    Comment(Comment),
    Junk(Junk),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resource {
    pub entries: Vec<Entry>,
    /// Resource-wide diagnostics that aren't attached to any single Junk
    /// entry (e.g. a nesting-depth clamp event observed while configuring
    /// the parser).
    pub diagnostics: Vec<Annotation>,
}

/// A sequence of text and placeables — the value of a message, term,
/// attribute, or variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pattern {
    pub elements: Vec<PatternElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternElement {
    TextElement(String),
    Placeable(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Inline(InlineExpression),
    Select(SelectExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InlineExpression {
    StringLiteral {
        value: String,
        span: Option<Span>,
    },
    /// Raw decoded numeric literal. `raw` preserves the source text (needed
    /// to tell `1` from `1.0` for variant-key formatting); `value` is the
    /// arbitrary-precision decoded form used by the resolver.
    NumberLiteral {
        raw: String,
        span: Option<Span>,
    },
    VariableReference {
        id: Identifier,
        span: Option<Span>,
    },
    MessageReference {
        id: Identifier,
        attribute: Option<Identifier>,
        span: Option<Span>,
    },
    TermReference {
        id: Identifier,
        attribute: Option<Identifier>,
        arguments: Option<CallArguments>,
        span: Option<Span>,
    },
    FunctionReference {
        id: Identifier,
        arguments: CallArguments,
        span: Option<Span>,
    },
    Placeable {
        expression: Box<Expression>,
        span: Option<Span>,
    },
}

impl InlineExpression {
    pub fn span(&self) -> Option<Span> {
        match self {
            InlineExpression::StringLiteral { span, .. }
            | InlineExpression::NumberLiteral { span, .. }
            | InlineExpression::VariableReference { span, .. }
            | InlineExpression::MessageReference { span, .. }
            | InlineExpression::TermReference { span, .. }
            | InlineExpression::FunctionReference { span, .. }
            | InlineExpression::Placeable { span, .. } => *span,
        }
    }
}

/// Selector key: either a plain identifier (`[one]`, `[other]`) or a
/// number literal for exact-numeric matching (`[0]`, `[1.1]`).
#[derive(Debug, Clone, PartialEq)]
pub enum VariantKey {
    Identifier(Identifier),
    NumberLiteral { raw: String, span: Option<Span> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub key: VariantKey,
    pub value: Pattern,
    pub default: bool,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpression {
    pub selector: Box<InlineExpression>,
    pub variants: Vec<Variant>,
    pub span: Option<Span>,
}

impl SelectExpression {
    /// The variant marked `default: true`. Invariant: the parser never
    /// produces a `SelectExpression` without exactly one; this returns
    /// `None` only for ASTs built by hand (e.g. in tests), which the
    /// semantic validator flags.
    pub fn default_variant(&self) -> Option<&Variant> {
        self.variants.iter().find(|v| v.default)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedArgument {
    pub name: Identifier,
    pub value: InlineExpression,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallArguments {
    pub positional: Vec<InlineExpression>,
    pub named: Vec<NamedArgument>,
}
