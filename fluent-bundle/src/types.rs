//! `FluentValue`: the open, tagged-enum capability type arguments and
//! resolved expressions flow through — a tagged enum plus a
//! canonicalization trait standing in for the reference's dynamically
//! dispatched value union.
//!
//! Collections are first-class variants (`Seq`, `Map`) instead of opaque
//! Python objects, and `NaN` gets its own canonical sentinel rather than
//! relying on `f64`'s non-reflexive equality, so a `FluentValue` can be
//! used directly as — or to build — a cache key (see [`crate::cache`]).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// `FluentValue::Number`'s three distinguishable numeric kinds. Keeping
/// these separate (rather than collapsing everything to `f64`) is what lets
/// the cache key distinguish `1` from `1.0` from `Decimal("1.0")` via
/// `("__int__", n)` / `("__float__", repr)` / `("__decimal__",
/// canonical_str)` tagging.
///
/// `Decimal` here is a simplified stand-in for the reference's
/// arbitrary-precision type: it keeps the original source text for exact
/// display and variant-key matching, backed by an `f64` for arithmetic and
/// formatting. True unbounded-precision decimal arithmetic is out of scope
/// for this crate (see `DESIGN.md`).
#[derive(Debug, Clone)]
pub enum FluentNumber {
    Int(i64),
    Float(f64),
    Decimal { raw: String, value: f64 },
}

impl FluentNumber {
    pub fn as_f64(&self) -> f64 {
        match self {
            FluentNumber::Int(n) => *n as f64,
            FluentNumber::Float(f) => *f,
            FluentNumber::Decimal { value, .. } => *value,
        }
    }

    pub fn is_nan(&self) -> bool {
        self.as_f64().is_nan()
    }

    /// Parses FTL `NumberLiteral` raw text (`-?[0-9]+(\.[0-9]+)?`) into the
    /// `Decimal` kind — a `NumberLiteral` resolves to the arbitrary-precision
    /// decimal value, keeping the source digits for exact variant-key
    /// matching.
    pub fn from_literal(raw: &str) -> Option<Self> {
        raw.parse::<f64>().ok().map(|value| FluentNumber::Decimal { raw: raw.to_string(), value })
    }

    pub fn decimal(value: f64) -> Self {
        FluentNumber::Decimal { raw: format!("{value}"), value }
    }
}

impl fmt::Display for FluentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FluentNumber::Int(n) => write!(f, "{n}"),
            FluentNumber::Float(x) => write!(f, "{x}"),
            FluentNumber::Decimal { raw, .. } => write!(f, "{raw}"),
        }
    }
}

impl PartialEq for FluentNumber {
    fn eq(&self, other: &Self) -> bool {
        self.as_f64() == other.as_f64()
    }
}

impl From<i64> for FluentNumber {
    fn from(n: i64) -> Self {
        FluentNumber::Int(n)
    }
}

impl From<f64> for FluentNumber {
    fn from(f: f64) -> Self {
        FluentNumber::Float(f)
    }
}

/// The value union that flows through argument maps, resolved expressions,
/// and cache keys. `None` is a distinct variant (rather than `Option`'s
/// absence) because FTL functions can return "no value" explicitly, the
/// same way the reference's `FluentValue` union admits it.
#[derive(Debug, Clone)]
pub enum FluentValue {
    None,
    String(String),
    Number(FluentNumber),
    DateTime(DateTime<Utc>),
    Seq(Vec<FluentValue>),
    Map(BTreeMap<String, FluentValue>),
}

impl FluentValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FluentValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&FluentNumber> {
        match self {
            FluentValue::Number(n) => Some(n),
            _ => None,
        }
    }
}

impl From<&str> for FluentValue {
    fn from(s: &str) -> Self {
        FluentValue::String(s.to_string())
    }
}

impl From<String> for FluentValue {
    fn from(s: String) -> Self {
        FluentValue::String(s)
    }
}

impl From<i64> for FluentValue {
    fn from(n: i64) -> Self {
        FluentValue::Number(FluentNumber::Int(n))
    }
}

impl From<f64> for FluentValue {
    fn from(n: f64) -> Self {
        FluentValue::Number(FluentNumber::Float(n))
    }
}

/// A fully hashable, tagged canonicalization of a [`FluentValue`], used to
/// build cache keys. Every variant here carries an explicit type tag in its
/// name so `1` (`Int`), `1.0` (`Float`), and a caller-supplied `Decimal`
/// never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalValue {
    None,
    Str(String),
    Int(i64),
    /// `repr`-style float text; `NaN` collapses to the `__NaN__` sentinel so
    /// repeated calls with freshly constructed NaNs hit the same cache
    /// entry instead of one new entry per call.
    Float(String),
    Decimal(String),
    DateTime(String),
    List(Vec<CanonicalValue>),
    Tuple(Vec<CanonicalValue>),
    /// Sorted so two sets with the same members canonicalize identically
    /// regardless of iteration order — sets are frozen to preserve
    /// hashability.
    Set(Vec<CanonicalValue>),
    /// `(key, canonicalized_value)` pairs sorted by key.
    Dict(Vec<(String, CanonicalValue)>),
}

const NAN_SENTINEL: &str = "__NaN__";

/// Depth budget for canonicalizing nested argument structures. Exceeding it
/// makes canonicalization fail so the caller can bypass the cache for that
/// call rather than recursing unboundedly.
pub const MAX_CANONICALIZATION_DEPTH: usize = 64;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CanonicalizationError {
    #[error("argument structure exceeds max canonicalization depth ({0})")]
    TooDeep(usize),
}

pub fn canonicalize(value: &FluentValue) -> Result<CanonicalValue, CanonicalizationError> {
    canonicalize_at_depth(value, 0)
}

fn canonicalize_at_depth(
    value: &FluentValue,
    depth: usize,
) -> Result<CanonicalValue, CanonicalizationError> {
    if depth > MAX_CANONICALIZATION_DEPTH {
        return Err(CanonicalizationError::TooDeep(MAX_CANONICALIZATION_DEPTH));
    }
    Ok(match value {
        FluentValue::None => CanonicalValue::None,
        FluentValue::String(s) => CanonicalValue::Str(s.clone()),
        FluentValue::Number(FluentNumber::Int(n)) => CanonicalValue::Int(*n),
        FluentValue::Number(FluentNumber::Float(f)) => {
            CanonicalValue::Float(canonicalize_float_repr(*f))
        }
        FluentValue::Number(FluentNumber::Decimal { raw, value }) => {
            CanonicalValue::Decimal(if value.is_nan() { NAN_SENTINEL.to_string() } else { raw.clone() })
        }
        FluentValue::DateTime(dt) => CanonicalValue::DateTime(dt.to_rfc3339()),
        FluentValue::Seq(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(canonicalize_at_depth(item, depth + 1)?);
            }
            CanonicalValue::List(out)
        }
        FluentValue::Map(map) => {
            let mut out = Vec::with_capacity(map.len());
            for (k, v) in map {
                out.push((k.clone(), canonicalize_at_depth(v, depth + 1)?));
            }
            CanonicalValue::Dict(out)
        }
    })
}

fn canonicalize_float_repr(f: f64) -> String {
    if f.is_nan() {
        NAN_SENTINEL.to_string()
    } else {
        format!("{f}")
    }
}

impl PartialOrd for CanonicalValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalValue {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &CanonicalValue) -> u8 {
            match v {
                CanonicalValue::None => 0,
                CanonicalValue::Str(_) => 1,
                CanonicalValue::Int(_) => 2,
                CanonicalValue::Float(_) => 3,
                CanonicalValue::Decimal(_) => 4,
                CanonicalValue::DateTime(_) => 5,
                CanonicalValue::List(_) => 6,
                CanonicalValue::Tuple(_) => 7,
                CanonicalValue::Set(_) => 8,
                CanonicalValue::Dict(_) => 9,
            }
        }
        match (self, other) {
            (CanonicalValue::Str(a), CanonicalValue::Str(b)) => a.cmp(b),
            (CanonicalValue::Int(a), CanonicalValue::Int(b)) => a.cmp(b),
            (CanonicalValue::Float(a), CanonicalValue::Float(b)) => a.cmp(b),
            (CanonicalValue::Decimal(a), CanonicalValue::Decimal(b)) => a.cmp(b),
            (CanonicalValue::DateTime(a), CanonicalValue::DateTime(b)) => a.cmp(b),
            (CanonicalValue::List(a), CanonicalValue::List(b))
            | (CanonicalValue::Tuple(a), CanonicalValue::Tuple(b))
            | (CanonicalValue::Set(a), CanonicalValue::Set(b)) => a.cmp(b),
            (CanonicalValue::Dict(a), CanonicalValue::Dict(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_floats_canonicalize_identically() {
        let a = canonicalize(&FluentValue::Number(FluentNumber::Float(f64::NAN))).unwrap();
        let b = canonicalize(&FluentValue::Number(FluentNumber::Float(f64::NAN))).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, CanonicalValue::Float(NAN_SENTINEL.to_string()));
    }

    #[test]
    fn nan_decimal_distinct_from_nan_float() {
        let float_nan = canonicalize(&FluentValue::Number(FluentNumber::Float(f64::NAN))).unwrap();
        let decimal_nan = canonicalize(&FluentValue::Number(FluentNumber::Decimal {
            raw: "NaN".to_string(),
            value: f64::NAN,
        }))
        .unwrap();
        assert_ne!(float_nan, decimal_nan);
    }

    #[test]
    fn infinities_keep_natural_form() {
        let pos = canonicalize(&FluentValue::Number(FluentNumber::Float(f64::INFINITY))).unwrap();
        let neg = canonicalize(&FluentValue::Number(FluentNumber::Float(f64::NEG_INFINITY))).unwrap();
        assert_eq!(pos, CanonicalValue::Float("inf".to_string()));
        assert_eq!(neg, CanonicalValue::Float("-inf".to_string()));
        assert_ne!(pos, neg);
    }

    #[test]
    fn dict_canonicalizes_sorted_by_key() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), FluentValue::from(1i64));
        map.insert("a".to_string(), FluentValue::from(2i64));
        let canon = canonicalize(&FluentValue::Map(map)).unwrap();
        match canon {
            CanonicalValue::Dict(pairs) => {
                assert_eq!(pairs[0].0, "a");
                assert_eq!(pairs[1].0, "b");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn depth_limit_bypasses_cache() {
        let mut value = FluentValue::from(1i64);
        for _ in 0..(MAX_CANONICALIZATION_DEPTH + 5) {
            value = FluentValue::Seq(vec![value]);
        }
        assert!(canonicalize(&value).is_err());
    }

    #[test]
    fn int_and_float_and_decimal_of_same_number_are_distinct() {
        let i = canonicalize(&FluentValue::from(1i64)).unwrap();
        let f = canonicalize(&FluentValue::from(1.0f64)).unwrap();
        let d = canonicalize(&FluentValue::Number(FluentNumber::Decimal {
            raw: "1.0".to_string(),
            value: 1.0,
        }))
        .unwrap();
        assert_ne!(i, f);
        assert_ne!(f, d);
        assert_ne!(i, d);
    }
}
