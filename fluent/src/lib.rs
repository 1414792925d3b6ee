//! Thin facade over `fluent-syntax` and `fluent-bundle`: pulling in this
//! crate alone gets you parsing, validation, and the full `Bundle`/
//! `Localization` resolver surface without naming either dependency
//! directly, the same split the reference workspace uses between its
//! low-level syntax crate and its resolution engine.
//!
//! ```
//! use fluent::{Bundle, BundleOptions};
//!
//! let bundle = Bundle::new("en-US", BundleOptions::default()).unwrap();
//! bundle.add_resource("hello = Hello, world!\n").unwrap();
//! let (value, errors) = bundle.format_value("hello", None);
//! assert_eq!(value, "Hello, world!");
//! assert!(errors.is_empty());
//! ```

pub use fluent_bundle::{
    system_locale, Bundle, BundleOptions, CacheConfig, CacheError, CacheKey, CacheStats,
    CanonicalValue, Diagnostic, Entry, FluentError, FluentFunction, FluentNumber, FluentValue,
    FunctionInfo, FunctionRegistry, FunctionSpec, IntegrityCache, Localization, LocaleContext,
    NumberFormatOptions, NumberStyle, Resource, ResolverError, RwLock, RwLockError, Severity,
    ValidationResult,
};

pub use fluent_syntax::introspection::{MessageInfo, ReferenceInfo, ReferenceKind};
pub use fluent_syntax::parser::{parse, parse_with_depth};
pub use fluent_syntax::validator::validate;
pub use fluent_syntax::{ast, introspection, validator, DiagnosticCode, ParseError};
