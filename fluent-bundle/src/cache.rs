//! FIFO-eviction cache keyed by canonicalized call identity (spec.md §4.10).
//!
//! A cache key is `(message_id, canonicalized_args, use_isolating, locale,
//! extra_context_hash)` — the resolved *string* result is a pure function of
//! exactly these inputs (absent non-deterministic functions, which bypass
//! the cache entirely; see `DESIGN.md`). The cache is invalidated wholesale
//! whenever the bundle's resolvable state changes (`add_resource`,
//! `add_function`) since any message's result could depend on anything.

use std::collections::{HashMap, VecDeque};

use crate::errors::{CacheError, ResolverError};
use crate::types::{canonicalize, CanonicalValue, FluentValue};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    message_id: String,
    args: Vec<(String, CanonicalValue)>,
    use_isolating: bool,
    locale: String,
    extra_context_hash: Option<String>,
}

impl CacheKey {
    /// Builds a cache key from a call's arguments. Returns
    /// `Err(CacheError::Unhashable)` if any argument exceeds the
    /// canonicalization depth budget — such a call simply isn't cached.
    pub fn build(
        message_id: &str,
        args: &HashMap<String, FluentValue>,
        use_isolating: bool,
        locale: &str,
        extra_context_hash: Option<String>,
    ) -> Result<Self, CacheError> {
        let mut canonical = Vec::with_capacity(args.len());
        for (k, v) in args {
            let c = canonicalize(v).map_err(|e| CacheError::Unhashable(e.to_string()))?;
            canonical.push((k.clone(), c));
        }
        canonical.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(CacheKey {
            message_id: message_id.to_string(),
            args: canonical,
            use_isolating,
            locale: locale.to_string(),
            extra_context_hash,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub unhashable_skips: u64,
    pub corpus_entries_added: u64,
    pub corpus_evictions: u64,
}

/// Bounded FIFO cache mapping call identity to a formatted string plus the
/// resolver errors that accompanied it. Both halves of the pair must be
/// cached together — a cache hit otherwise silently drops whatever
/// missing-variable/cyclic-reference/etc. errors the original (miss) call
/// collected, even though the memoized string is the same as if those
/// errors had just been produced again (spec.md §3.4, §4.10).
///
/// Eviction is strict insertion-order FIFO, not LRU: the reference
/// implementation's `corpus` is a plain bounded dict with oldest-first
/// eviction, not an access-order structure, so a frequently-reused old
/// entry is evicted just the same as a stale one (spec.md §4.10, Open
/// Question recorded in `SPEC_FULL.md`).
pub struct IntegrityCache {
    capacity: usize,
    order: VecDeque<CacheKey>,
    entries: HashMap<CacheKey, (String, Vec<ResolverError>)>,
    stats: CacheStats,
}

impl IntegrityCache {
    pub fn new(capacity: usize) -> Self {
        IntegrityCache { capacity, order: VecDeque::new(), entries: HashMap::new(), stats: CacheStats::default() }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<(String, Vec<ResolverError>)> {
        if let Some((formatted, errors)) = self.entries.get(key) {
            self.stats.hits += 1;
            Some((formatted.clone(), errors.clone()))
        } else {
            self.stats.misses += 1;
            None
        }
    }

    pub fn insert(&mut self, key: CacheKey, value: String, errors: Vec<ResolverError>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.contains_key(&key) {
            self.entries.insert(key, (value, errors));
            return;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                self.stats.corpus_evictions += 1;
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, (value, errors));
        self.stats.corpus_entries_added += 1;
    }

    pub fn record_unhashable_skip(&mut self) {
        self.stats.unhashable_skips += 1;
    }

    /// Drops all entries. Per an explicit Open Question decision
    /// (`SPEC_FULL.md` §4), hit/miss/skip counters are cumulative telemetry
    /// and are NOT reset here — only `corpus_entries_added`/`corpus_evictions`
    /// reset along with the corpus itself, since those describe corpus
    /// membership churn, not cumulative access history.
    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
        self.stats.corpus_entries_added = 0;
        self.stats.corpus_evictions = 0;
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> CacheKey {
        CacheKey::build(id, &HashMap::new(), true, "en-US", None).unwrap()
    }

    #[test]
    fn fifo_eviction_order() {
        let mut cache = IntegrityCache::new(2);
        cache.insert(key("a"), "A".to_string(), Vec::new());
        cache.insert(key("b"), "B".to_string(), Vec::new());
        cache.insert(key("c"), "C".to_string(), Vec::new());
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("a")).is_none());
        assert!(cache.get(&key("b")).is_some());
        assert_eq!(cache.stats().corpus_evictions, 1);
    }

    #[test]
    fn clear_does_not_reset_hit_miss_counters() {
        let mut cache = IntegrityCache::new(4);
        cache.insert(key("a"), "A".to_string(), Vec::new());
        cache.get(&key("a"));
        cache.get(&key("missing"));
        cache.clear();
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().corpus_entries_added, 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn nan_args_canonicalize_to_stable_key() {
        use crate::types::FluentNumber;
        let mut args = HashMap::new();
        args.insert("n".to_string(), FluentValue::Number(FluentNumber::Float(f64::NAN)));
        let k1 = CacheKey::build("m", &args, true, "en-US", None).unwrap();
        let k2 = CacheKey::build("m", &args, true, "en-US", None).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn cached_hit_returns_the_same_errors_as_the_original_miss() {
        let mut cache = IntegrityCache::new(4);
        let errors = vec![ResolverError::MissingVariable("name".to_string())];
        cache.insert(key("greet"), "Hello, {$name}!".to_string(), errors.clone());
        let (value, hit_errors) = cache.get(&key("greet")).unwrap();
        assert_eq!(value, "Hello, {$name}!");
        assert_eq!(hit_errors, errors);
    }
}
