//! `Bundle` and `Localization`: the public façade composing the parser,
//! resolver, locale context, function registry, concurrency, and cache
//! layers into the per-locale and fallback-chain entry points.
//!
//! `Bundle`'s shared mutable state is split across two synchronization
//! layers rather than one, a deliberate adaptation from the reference
//! recorded in `DESIGN.md`: a hand-rolled [`RwLock`] provides the full
//! coordination contract (timeouts, reentrancy, writer preference,
//! downgrade, upgrade rejection — all directly unit tested in
//! `rwlock.rs`), while the actual messages/terms/cache live behind ordinary
//! `std::sync` primitives so every access to them stays safe Rust. The two
//! are always acquired and released together within one `Bundle` method, so
//! they can never disagree about who currently holds access.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock as StdRwLock};
use std::time::Duration;

use fluent_syntax::ast::{Entry, Message, Term};
use fluent_syntax::diagnostics::LineOffsetCache;
use fluent_syntax::introspection::{self, MessageInfo};
use fluent_syntax::parser::{self, DEFAULT_MAX_NESTING_DEPTH};
use fluent_syntax::validator::{self, ValidationResult};

use crate::cache::{CacheKey, CacheStats, IntegrityCache};
use crate::errors::{FluentError, ResolverError};
use crate::function::{FunctionRegistry, RegistrationError};
use crate::function::{FluentFunction, FunctionSpec};
use crate::locale::LocaleContext;
use crate::resolver::{self, MessageStore, Scope};
use crate::rwlock::RwLock;
use crate::types::FluentValue;

/// Which namespace an introspection-cache entry belongs to: messages and
/// terms can share a name, so the cache key must be tagged the same way the
/// validator's dependency graph tags its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EntryTag {
    Message,
    Term,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    /// Within the documented 500-2000 default range.
    fn default() -> Self {
        CacheConfig { capacity: 1000 }
    }
}

#[derive(Clone)]
pub struct BundleOptions {
    pub use_isolating: bool,
    pub max_nesting_depth: usize,
    pub cache_config: CacheConfig,
    /// Starting function registry. `None` uses [`FunctionRegistry::with_builtins`];
    /// callers who want `NUMBER`/`DATETIME`/`CURRENCY` *and* custom functions
    /// should build on top of `with_builtins()` themselves and pass the
    /// result here, the same way the reference's bridge starts from a
    /// shared frozen default and `copy()`s it per bundle.
    pub functions: Option<FunctionRegistry>,
}

impl Default for BundleOptions {
    fn default() -> Self {
        BundleOptions {
            use_isolating: true,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            cache_config: CacheConfig::default(),
            functions: None,
        }
    }
}

/// The registry half of a bundle's shared state: messages, terms, the
/// function registry, and the cross-resource id sets the validator needs
/// for shadow-warning checks.
struct Registry {
    messages: HashMap<String, Message>,
    terms: HashMap<String, Term>,
    functions: FunctionRegistry,
    known_message_ids: HashSet<String>,
    known_term_ids: HashSet<String>,
}

impl MessageStore for Registry {
    fn get_message(&self, id: &str) -> Option<&Message> {
        self.messages.get(id)
    }

    fn get_term(&self, id: &str) -> Option<&Term> {
        self.terms.get(id)
    }
}

/// A collection of localization messages in a single locale. Safe to share
/// across threads behind an `Arc`: every public method acquires its own
/// coordination/data locks and releases them before returning.
pub struct Bundle {
    coordination: RwLock,
    registry: StdRwLock<Registry>,
    cache: Mutex<IntegrityCache>,
    introspection_cache: Mutex<HashMap<(EntryTag, String), MessageInfo>>,
    locale: LocaleContext,
    locale_str: String,
    use_isolating: bool,
    max_nesting_depth: usize,
}

impl Bundle {
    /// # Examples
    ///
    /// ```
    /// use fluent_bundle::{Bundle, BundleOptions};
    /// use std::collections::HashMap;
    ///
    /// let bundle = Bundle::new("en-US", BundleOptions::default()).unwrap();
    /// bundle.add_resource("intro = Welcome, { $name }.\n").unwrap();
    ///
    /// let mut args = HashMap::new();
    /// args.insert("name".to_string(), "Rustacean".into());
    /// let (value, errors) = bundle.format_value("intro", Some(&args));
    /// assert_eq!(value, "Welcome, \u{2068}Rustacean\u{2069}.");
    /// assert!(errors.is_empty());
    /// ```
    pub fn new(locale: &str, options: BundleOptions) -> Result<Self, FluentError> {
        if locale.trim().is_empty() {
            return Err(FluentError::InvalidLocale("locale code must not be empty".to_string()));
        }
        let ctx = LocaleContext::new(locale).map_err(FluentError::InvalidLocale)?;
        let locale_str = ctx.normalized();
        let functions = options.functions.unwrap_or_else(FunctionRegistry::with_builtins);
        Ok(Bundle {
            coordination: RwLock::new(),
            registry: StdRwLock::new(Registry {
                messages: HashMap::new(),
                terms: HashMap::new(),
                functions,
                known_message_ids: HashSet::new(),
                known_term_ids: HashSet::new(),
            }),
            cache: Mutex::new(IntegrityCache::new(options.cache_config.capacity)),
            introspection_cache: Mutex::new(HashMap::new()),
            locale: ctx,
            locale_str,
            use_isolating: options.use_isolating,
            max_nesting_depth: options.max_nesting_depth,
        })
    }

    pub fn locale(&self) -> &str {
        &self.locale_str
    }

    /// Parses `source`, merges its messages/terms into the bundle (later
    /// additions shadow earlier ones with the same id), and invalidates the
    /// format cache. Never fails outright on malformed FTL — unparseable
    /// regions become `Junk` and are reported in the returned
    /// `ValidationResult`, not as an `Err`.
    pub fn add_resource(&self, source: &str) -> Result<ValidationResult, FluentError> {
        let _guard = self.coordination.write();
        let resource = parser::parse_with_depth(source, self.max_nesting_depth);
        let normalized = parser::normalize_line_endings(source);
        let line_cache = LineOffsetCache::new(&normalized);

        let mut registry = self.registry.write().expect("registry lock poisoned");
        let result =
            validator::validate(&resource, &registry.known_message_ids, &registry.known_term_ids, &line_cache);

        for entry in resource.entries {
            match entry {
                Entry::Message(m) => {
                    registry.known_message_ids.insert(m.id.name.clone());
                    registry.messages.insert(m.id.name.clone(), m);
                }
                Entry::Term(t) => {
                    registry.known_term_ids.insert(t.id.name.clone());
                    registry.terms.insert(t.id.name.clone(), t);
                }
                Entry::Comment(_) | Entry::Junk(_) => {}
            }
        }
        drop(registry);

        self.invalidate_cache();
        log::debug!("add_resource invalidated cache for locale {}", self.locale_str);
        Ok(result)
    }

    /// Parses and validates `source` without mutating the bundle. Useful
    /// for e.g. a linting tool that wants diagnostics without committing the
    /// resource.
    pub fn validate_resource(&self, source: &str) -> ValidationResult {
        let _guard = self.coordination.read();
        let registry = self.registry.read().expect("registry lock poisoned");
        let resource = parser::parse_with_depth(source, self.max_nesting_depth);
        let normalized = parser::normalize_line_endings(source);
        let line_cache = LineOffsetCache::new(&normalized);
        validator::validate(&resource, &registry.known_message_ids, &registry.known_term_ids, &line_cache)
    }

    /// Registers a custom function under `ftl_name`, rejecting the call if
    /// the registry has been frozen or if `spec`'s parameter names collide
    /// after underscore-stripping.
    pub fn add_function(
        &self,
        ftl_name: &str,
        func: FluentFunction,
        spec: FunctionSpec,
    ) -> Result<(), FluentError> {
        let _guard = self.coordination.write();
        let mut registry = self.registry.write().expect("registry lock poisoned");
        registry.functions.register(ftl_name, func, spec).map_err(FluentError::from)?;
        drop(registry);
        self.invalidate_cache();
        log::debug!("add_function({ftl_name}) invalidated cache for locale {}", self.locale_str);
        Ok(())
    }

    fn invalidate_cache(&self) {
        self.cache.lock().expect("cache mutex poisoned").clear();
        self.introspection_cache.lock().expect("introspection mutex poisoned").clear();
    }

    /// Returns `true` if this bundle defines the given message or term id
    /// (an optional `.attribute` suffix is ignored for the purposes of this
    /// check). Used by [`Localization`]'s fallback chain to decide whether
    /// to try the next locale.
    pub fn has_message(&self, id: &str) -> bool {
        let _guard = self.coordination.read();
        let registry = self.registry.read().expect("registry lock poisoned");
        let base = id.split('.').next().unwrap_or(id);
        registry.messages.contains_key(base) || registry.terms.contains_key(base)
    }

    /// Formats a message (or `id.attribute`) against `args`, blocking
    /// indefinitely for the read lock. Never fails: a missing message,
    /// missing variable, or function error all degrade to a fallback
    /// placeholder string plus a collected [`ResolverError`].
    pub fn format_value(
        &self,
        id: &str,
        args: Option<&HashMap<String, FluentValue>>,
    ) -> (String, Vec<ResolverError>) {
        self.try_format_value(id, args, None).expect("indefinite wait cannot time out")
    }

    /// Alias for [`Bundle::format_value`] — the reference distinguishes
    /// `format_value`/`format_pattern` only by whether the caller wants the
    /// raw (unresolved) `Pattern` back; this crate's resolver always
    /// produces the final string, so the two collapse into one operation
    /// here (see `DESIGN.md`).
    pub fn format_pattern(
        &self,
        id: &str,
        args: Option<&HashMap<String, FluentValue>>,
    ) -> (String, Vec<ResolverError>) {
        self.format_value(id, args)
    }

    /// Timeout-aware variant of [`Bundle::format_value`]. Propagates
    /// [`FluentError::RwLock`] on a lock timeout rather than degrading —
    /// a timeout is a caller configuration problem, not a formatting one.
    pub fn try_format_value(
        &self,
        id: &str,
        args: Option<&HashMap<String, FluentValue>>,
        timeout: Option<Duration>,
    ) -> Result<(String, Vec<ResolverError>), FluentError> {
        let _guard = self.coordination.try_read(timeout)?;
        let empty = HashMap::new();
        let args = args.unwrap_or(&empty);

        let key = match CacheKey::build(id, args, self.use_isolating, &self.locale_str, None) {
            Ok(key) => Some(key),
            Err(_) => {
                self.cache.lock().expect("cache mutex poisoned").record_unhashable_skip();
                None
            }
        };

        if let Some(key) = &key {
            if let Some(hit) = self.cache.lock().expect("cache mutex poisoned").get(key) {
                return Ok(hit);
            }
        }

        let registry = self.registry.read().expect("registry lock poisoned");
        let (formatted, errors) = resolve_against(id, args, &registry, &self.locale, self.use_isolating);
        drop(registry);

        if let Some(key) = key {
            self.cache
                .lock()
                .expect("cache mutex poisoned")
                .insert(key, formatted.clone(), errors.clone());
        }
        Ok((formatted, errors))
    }

    /// Read-only static analysis of a single message or term. Results are
    /// cached by id for the lifetime of the current
    /// resource generation; a concurrent `add_resource`/`add_function` may
    /// leave a reader observing a stale entry for one cycle, per the
    /// documented best-effort contract.
    pub fn introspect_message(&self, id: &str) -> Option<MessageInfo> {
        let _guard = self.coordination.read();
        let registry = self.registry.read().expect("registry lock poisoned");

        if let Some(m) = registry.messages.get(id) {
            let key = (EntryTag::Message, id.to_string());
            let mut cache = self.introspection_cache.lock().expect("introspection mutex poisoned");
            if let Some(info) = cache.get(&key) {
                return Some(info.clone());
            }
            let info = introspection::introspect_message(m);
            cache.insert(key, info.clone());
            Some(info)
        } else {
            registry.terms.get(id).map(|t| {
                let key = (EntryTag::Term, id.to_string());
                let mut cache = self.introspection_cache.lock().expect("introspection mutex poisoned");
                if let Some(info) = cache.get(&key) {
                    return info.clone();
                }
                let info = introspection::introspect_term(t);
                cache.insert(key, info.clone());
                info
            })
        }
    }

    pub fn get_message_variables(&self, id: &str) -> Option<BTreeSet<String>> {
        self.introspect_message(id).map(|info| info.variables)
    }

    pub fn get_all_message_variables(&self) -> HashMap<String, BTreeSet<String>> {
        let _guard = self.coordination.read();
        let registry = self.registry.read().expect("registry lock poisoned");
        registry
            .messages
            .keys()
            .map(|id| (id.clone(), introspection::introspect_message(&registry.messages[id]).variables))
            .collect()
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        let _guard = self.coordination.read();
        self.cache.lock().expect("cache mutex poisoned").stats().clone()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().expect("cache mutex poisoned").len()
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache.lock().expect("cache mutex poisoned").capacity()
    }
}

fn resolve_against(
    id: &str,
    args: &HashMap<String, FluentValue>,
    registry: &Registry,
    locale: &LocaleContext,
    use_isolating: bool,
) -> (String, Vec<ResolverError>) {
    let mut scope = Scope::new(registry, &registry.functions, locale, args, use_isolating);
    let formatted = match id.split_once('.') {
        Some((message_id, attribute)) => resolver::format_attribute(&mut scope, message_id, attribute),
        None => resolver::format_message(&mut scope, id),
    };
    (formatted, scope.errors)
}

impl From<RegistrationError> for FluentError {
    fn from(err: RegistrationError) -> Self {
        FluentError::FunctionRegistration(err)
    }
}

/// Aggregate cache statistics across a [`Localization`]'s currently
/// initialized bundles (spec.md §4.10 "Aggregation"). Bundles that have
/// never been touched (lazy, per spec.md §4.11) are not counted and do not
/// contribute to `maxsize`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedCacheStats {
    pub size: usize,
    pub maxsize: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub initialized_bundles: usize,
}

/// A fallback chain of `Bundle`s, one per locale, queried in order (spec.md
/// §4.11). Bundles are created lazily on first lookup; the resource
/// provider closure supplies FTL source text for a locale on demand (file
/// loading itself is an explicit non-goal — spec.md §1 — callers always
/// supply source bytes).
pub struct Localization {
    locales: Vec<String>,
    options: BundleOptions,
    resource_provider: Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>,
    bundles: StdRwLock<HashMap<String, Arc<Bundle>>>,
}

impl Localization {
    /// `locales` is deduplicated preserving first occurrence (spec.md
    /// §4.11). `resource_provider` is called once per locale, the first
    /// time that locale's bundle is needed, and should return every FTL
    /// resource source that locale should register.
    pub fn new(
        locales: impl IntoIterator<Item = impl Into<String>>,
        resource_provider: impl Fn(&str) -> Vec<String> + Send + Sync + 'static,
        options: BundleOptions,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut deduped = Vec::new();
        for locale in locales {
            let locale = locale.into();
            if seen.insert(locale.clone()) {
                deduped.push(locale);
            }
        }
        Localization {
            locales: deduped,
            options,
            resource_provider: Arc::new(resource_provider),
            bundles: StdRwLock::new(HashMap::new()),
        }
    }

    pub fn locales(&self) -> &[String] {
        &self.locales
    }

    fn bundle_for(&self, locale: &str) -> Result<Arc<Bundle>, FluentError> {
        if let Some(bundle) = self.bundles.read().expect("bundles lock poisoned").get(locale) {
            return Ok(bundle.clone());
        }
        let mut bundles = self.bundles.write().expect("bundles lock poisoned");
        if let Some(bundle) = bundles.get(locale) {
            return Ok(bundle.clone());
        }
        let bundle = Bundle::new(locale, self.options.clone())?;
        for source in (self.resource_provider)(locale) {
            bundle.add_resource(&source)?;
        }
        let bundle = Arc::new(bundle);
        bundles.insert(locale.to_string(), bundle.clone());
        Ok(bundle)
    }

    /// Queries each locale's bundle in order and returns the first whose
    /// result comes from an id it actually defines; degrades to the first
    /// locale's own `{id}` fallback if no bundle in the chain defines it.
    pub fn format_value(
        &self,
        id: &str,
        args: Option<&HashMap<String, FluentValue>>,
    ) -> (String, Vec<ResolverError>) {
        for locale in &self.locales {
            if let Ok(bundle) = self.bundle_for(locale) {
                if bundle.has_message(id) {
                    return bundle.format_value(id, args);
                }
            }
        }
        if let Some(first) = self.locales.first() {
            if let Ok(bundle) = self.bundle_for(first) {
                return bundle.format_value(id, args);
            }
        }
        (format!("{{{id}}}"), vec![ResolverError::UnknownMessage(id.to_string())])
    }

    /// Aggregate cache stats across bundles that have actually been
    /// initialized so far (spec.md §4.10 Aggregation).
    pub fn get_cache_stats(&self) -> AggregatedCacheStats {
        let bundles = self.bundles.read().expect("bundles lock poisoned");
        let mut agg = AggregatedCacheStats { initialized_bundles: bundles.len(), ..Default::default() };
        for bundle in bundles.values() {
            let stats = bundle.get_cache_stats();
            agg.hits += stats.hits;
            agg.misses += stats.misses;
            agg.size += bundle.cache_len();
            agg.maxsize += bundle.cache_capacity();
        }
        let total = agg.hits + agg.misses;
        agg.hit_rate = if total == 0 { 0.0 } else { round_to_two_decimals(agg.hits as f64 / total as f64) };
        agg
    }
}

fn round_to_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(locale: &str) -> Bundle {
        Bundle::new(locale, BundleOptions::default()).unwrap()
    }

    #[test]
    fn format_value_resolves_simple_message() {
        let b = bundle("en-US");
        b.add_resource("hello = Hi there!\n").unwrap();
        let (value, errors) = b.format_value("hello", None);
        assert_eq!(value, "Hi there!");
        assert!(errors.is_empty());
    }

    #[test]
    fn missing_message_degrades_with_error() {
        let b = bundle("en-US");
        let (value, errors) = b.format_value("missing", None);
        assert_eq!(value, "{missing}");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn repeated_calls_hit_the_cache() {
        let b = bundle("en-US");
        b.add_resource("hello = Hi!\n").unwrap();
        b.format_value("hello", None);
        b.format_value("hello", None);
        let stats = b.get_cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn add_resource_invalidates_cache() {
        let b = bundle("en-US");
        b.add_resource("hello = Hi!\n").unwrap();
        b.format_value("hello", None);
        assert_eq!(b.cache_len(), 1);
        b.add_resource("hello = Hi again!\n").unwrap();
        assert_eq!(b.cache_len(), 0);
        let (value, _) = b.format_value("hello", None);
        assert_eq!(value, "Hi again!");
    }

    #[test]
    fn duplicate_attribute_reported_as_validation_warning() {
        let b = bundle("en-US");
        let result = b.add_resource("hello = Hi!\n    .tooltip = A\n    .tooltip = B\n").unwrap();
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn format_attribute_via_dotted_id() {
        let b = bundle("en-US");
        b.add_resource("hello = Hi!\n    .tooltip = A greeting\n").unwrap();
        let (value, errors) = b.format_value("hello.tooltip", None);
        assert_eq!(value, "A greeting");
        assert!(errors.is_empty());
    }

    #[test]
    fn introspection_reports_variables() {
        let b = bundle("en-US");
        b.add_resource("greet = Hello, { $name }!\n").unwrap();
        let vars = b.get_message_variables("greet").unwrap();
        assert!(vars.contains("name"));
    }

    #[test]
    fn shadowing_second_resource_wins_and_warns() {
        let b = bundle("en-US");
        b.add_resource("hello = First\n").unwrap();
        let result = b.add_resource("hello = Second\n").unwrap();
        assert!(!result.warnings.is_empty());
        let (value, _) = b.format_value("hello", None);
        assert_eq!(value, "Second");
    }

    #[test]
    fn localization_falls_back_through_locale_chain() {
        let localization = Localization::new(
            vec!["lv", "en"],
            |locale| match locale {
                "lv" => vec!["hello = Sveiki, { $name }!\n".to_string()],
                _ => vec!["hello = Hello, { $name }!\n".to_string(), "goodbye = Goodbye!\n".to_string()],
            },
            BundleOptions::default(),
        );

        let mut args = HashMap::new();
        args.insert("name".to_string(), "Anna".into());
        let (value, errors) = localization.format_value("hello", Some(&args));
        assert_eq!(value, "Sveiki, \u{2068}Anna\u{2069}!");
        assert!(errors.is_empty());

        let (value, errors) = localization.format_value("goodbye", None);
        assert_eq!(value, "Goodbye!");
        assert!(errors.is_empty());
    }

    #[test]
    fn localization_deduplicates_locales_preserving_first_occurrence() {
        let localization =
            Localization::new(vec!["en", "fr", "en"], |_| Vec::new(), BundleOptions::default());
        assert_eq!(localization.locales(), &["en".to_string(), "fr".to_string()]);
    }
}
