//! The fully-featured Fluent localization engine: resolver, locale-aware
//! formatting, function registry, concurrency, and caching, built on top of
//! the parser and AST in `fluent-syntax`.
//!
//! `fluent_syntax` only turns source bytes into a `Resource` and answers
//! static questions about one; everything that needs a locale, an argument
//! map, or concurrent access lives here. `Bundle` is the per-locale entry
//! point; `Localization` composes several `Bundle`s into a fallback chain.

pub mod bundle;
pub mod cache;
pub mod errors;
pub mod function;
pub mod locale;
pub mod resolver;
pub mod rwlock;
pub mod types;

pub use bundle::{Bundle, BundleOptions, CacheConfig, Localization};
pub use cache::{CacheKey, CacheStats, IntegrityCache};
pub use errors::{CacheError, FluentError, ResolverError, RwLockError};
pub use function::{FluentFunction, FunctionInfo, FunctionRegistry, FunctionSpec};
pub use locale::{system_locale, LocaleContext, NumberFormatOptions, NumberStyle};
pub use rwlock::RwLock;
pub use types::{CanonicalValue, FluentNumber, FluentValue};

pub use fluent_syntax::ast::{Entry, Resource};
pub use fluent_syntax::validator::{Diagnostic, Severity, ValidationResult};
