//! Runtime error categories for the resolver, concurrency, and cache
//! layers (spec.md §3.3, §4.9, §4.10). These are distinct from
//! `fluent_syntax`'s parse-time `ParseError`/`DiagnosticCode`: everything
//! here happens after a resource has already parsed successfully.

use thiserror::Error;

use crate::function::RegistrationError;

/// Errors produced while resolving a message/term into a formatted string.
/// Resolution never aborts on these in the public `Bundle::format_*` API —
/// they are collected alongside a best-effort fallback string, matching
/// spec.md §4.7's "formatting degrades, it does not fail" contract. The
/// enum still exists so callers that want strict behavior can inspect and
/// act on it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolverError {
    #[error("unknown message: {0}")]
    UnknownMessage(String),
    #[error("unknown term: {0}")]
    UnknownTerm(String),
    #[error("message {0} has no value")]
    NoValue(String),
    #[error("unknown attribute: {message}.{attribute}")]
    UnknownAttribute { message: String, attribute: String },
    #[error("missing variable: ${0}")]
    MissingVariable(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("function {function} failed: {message}")]
    FunctionCall { function: String, message: String },
    #[error("cyclic reference detected at {0}")]
    Cyclic(String),
    #[error("reference chain exceeded max depth ({0})")]
    TooDeep(usize),
    #[error("select expression is missing a default variant")]
    NoDefaultVariant,
}

/// Errors surfaced by [`crate::rwlock::RwLock`] acquisition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RwLockError {
    #[error("lock acquisition timed out")]
    Timeout,
    #[error("upgrading a read lock to a write lock is not supported")]
    UpgradeNotSupported,
    #[error("negative timeout is invalid")]
    InvalidTimeout,
}

/// Errors surfaced by [`crate::cache::IntegrityCache`] when a call's
/// arguments cannot be canonicalized into a cache key. The cache treats
/// this as "don't cache this call", not a hard failure — callers still get
/// a formatted result, just an uncached one (spec.md §4.10).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("call arguments are not cacheable: {0}")]
    Unhashable(String),
}

/// Top-level error type for `Bundle`/`Localization` operations that are
/// expected to be able to fail outright (as opposed to `format_*`, which
/// degrades instead of failing).
#[derive(Debug, Clone, Error)]
pub enum FluentError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error(transparent)]
    RwLock(#[from] RwLockError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    FunctionRegistration(#[from] RegistrationError),
    #[error("resource failed to parse or validate: {0}")]
    InvalidResource(String),
    /// Propagates for real construction-time programmer errors (spec.md §7:
    /// "`ValueError` from locale validation ... propagates"), as opposed to
    /// the degrade-don't-fail contract every `format_*` call follows.
    #[error("invalid locale: {0}")]
    InvalidLocale(String),
}
