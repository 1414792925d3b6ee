//! Locale-aware formatting (spec.md §4.6 `LOCALE_CONTEXT`).
//!
//! Full CLDR data acquisition is an explicit non-goal (spec.md Non-goals),
//! so number grouping/precision and currency symbols are a small
//! self-contained approximation rather than a `cldr-*`-backed
//! implementation, and datetime formatting leans on `chrono` the way the
//! rest of this corpus does (see `examples/other_examples` manifests).
//! Plural categorization is the one piece that *is* backed by a real CLDR
//! derivative, `intl_pluralrules`, because the teacher crate already
//! depends on it for exactly this purpose.

use chrono::{DateTime, Utc};
use intl_pluralrules::{IntlPluralRules, PluralCategory, PluralRuleType};
use unic_langid::LanguageIdentifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberStyle {
    Decimal,
    Percent,
    Currency,
}

#[derive(Debug, Clone)]
pub struct NumberFormatOptions {
    pub style: NumberStyle,
    pub minimum_fraction_digits: Option<usize>,
    pub maximum_fraction_digits: Option<usize>,
    pub use_grouping: bool,
    pub currency: Option<String>,
}

impl Default for NumberFormatOptions {
    fn default() -> Self {
        NumberFormatOptions {
            style: NumberStyle::Decimal,
            minimum_fraction_digits: None,
            maximum_fraction_digits: None,
            use_grouping: true,
            currency: None,
        }
    }
}

/// A minimal built-in currency symbol table, covering the currencies that
/// show up in the retrieved corpus's test fixtures. Anything else falls
/// back to the bare ISO 4217 code, which is always unambiguous even if
/// less friendly than a locale-correct glyph.
fn currency_symbol(code: &str, _locale: &LanguageIdentifier) -> String {
    match code {
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "JPY" => "¥".to_string(),
        _ => format!("{code} "),
    }
}

/// Wraps a negotiated locale's plural rules and formatting conventions.
/// One `LocaleContext` is created per normalized locale string and cached
/// by `Bundle`/`Localization` (spec.md §4.6: "cached per normalized
/// locale").
pub struct LocaleContext {
    locale: LanguageIdentifier,
    cardinal_rules: IntlPluralRules,
}

impl LocaleContext {
    pub fn new(locale_str: &str) -> Result<Self, String> {
        let locale: LanguageIdentifier =
            locale_str.parse().map_err(|e| format!("invalid locale {locale_str:?}: {e}"))?;
        let negotiated = negotiate_plural_locale(&locale);
        let cardinal_rules = IntlPluralRules::create(negotiated, PluralRuleType::CARDINAL)
            .map_err(|e| format!("no plural rules for {locale_str:?}: {e}"))?;
        Ok(LocaleContext { locale, cardinal_rules })
    }

    pub fn normalized(&self) -> String {
        self.locale.to_string()
    }

    /// CLDR-equivalent plural categorization used by `SelectExpression`
    /// evaluation (spec.md §4.8): exact-numeric variant matches are tried by
    /// the resolver *before* falling back to this category.
    pub fn plural_category(&self, n: f64) -> &'static str {
        match self.cardinal_rules.select(n).unwrap_or(PluralCategory::OTHER) {
            PluralCategory::ZERO => "zero",
            PluralCategory::ONE => "one",
            PluralCategory::TWO => "two",
            PluralCategory::FEW => "few",
            PluralCategory::MANY => "many",
            PluralCategory::OTHER => "other",
        }
    }

    pub fn format_number(&self, value: f64, opts: &NumberFormatOptions) -> String {
        match opts.style {
            NumberStyle::Percent => format_grouped(value * 100.0, opts) + "%",
            NumberStyle::Currency => {
                let code = opts.currency.as_deref().unwrap_or("USD");
                let symbol = currency_symbol(code, &self.locale);
                format!("{symbol}{}", format_grouped(value, opts))
            }
            NumberStyle::Decimal => format_grouped(value, opts),
        }
    }

    /// `DATETIME()` builtin support. Per the recorded Open Question
    /// decision in `SPEC_FULL.md` §4: an explicit `pattern` argument wins
    /// when supplied, but an invalid pattern degrades to ISO 8601 rather
    /// than erroring, consistent with the resolver's degrade-don't-fail
    /// contract.
    pub fn format_datetime(&self, value: &DateTime<Utc>, pattern: Option<&str>) -> String {
        if let Some(pattern) = pattern {
            let chrono_pattern = translate_skeleton(pattern);
            let formatted = value.format(&chrono_pattern).to_string();
            if formatted.contains('%') {
                value.to_rfc3339()
            } else {
                formatted
            }
        } else {
            value.to_rfc3339()
        }
    }
}

fn negotiate_plural_locale(locale: &LanguageIdentifier) -> LanguageIdentifier {
    let available = IntlPluralRules::get_locales(PluralRuleType::CARDINAL);
    if available.iter().any(|l| l == locale) {
        return locale.clone();
    }
    let base = LanguageIdentifier::from_parts(locale.language, None, None, &[]);
    if available.iter().any(|l| l == &base) {
        return base;
    }
    "en".parse().expect("'en' is always a valid language identifier")
}

fn format_grouped(value: f64, opts: &NumberFormatOptions) -> String {
    let min_frac = opts.minimum_fraction_digits.unwrap_or(0);
    let max_frac = opts.maximum_fraction_digits.unwrap_or(min_frac.max(3));
    let max_frac = max_frac.max(min_frac);
    let rounded = round_half_up(value, max_frac);
    let (int_part, frac_part) = match rounded.split_once('.') {
        Some((i, f)) => (i, f),
        None => (rounded.as_str(), ""),
    };
    let mut frac = frac_part.trim_end_matches('0').to_string();
    while frac.len() < min_frac {
        frac.push('0');
    }

    let negative = int_part.starts_with('-');
    let digits = if negative { &int_part[1..] } else { int_part };
    let grouped = if opts.use_grouping { group_thousands(digits) } else { digits.to_string() };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }
    out
}

/// Rounds `value` to `digits` fractional places using half-up (half away
/// from zero) semantics — `0.5 -> 1`, `-0.5 -> -1` — rather than the
/// formatting-layer rounding `format!`'s `{:.*}` performs, which is not
/// guaranteed to agree on exact halfway values (spec.md §4.6: "rounding is
/// CLDR half-up, not banker's rounding"). `f64::round` itself is
/// half-away-from-zero, so scaling by a power of ten and rounding the
/// integer gives the right answer; the result is then rendered digit by
/// digit to avoid reintroducing binary float error through `format!`.
fn round_half_up(value: f64, digits: usize) -> String {
    let factor = 10f64.powi(digits as i32);
    let scaled = (value * factor).round();
    let negative = scaled < 0.0;
    let abs_int = scaled.abs() as u128;
    if digits == 0 {
        return if negative { format!("-{abs_int}") } else { abs_int.to_string() };
    }
    let mut digits_str = abs_int.to_string();
    while digits_str.len() <= digits {
        digits_str.insert(0, '0');
    }
    let split_at = digits_str.len() - digits;
    let (int_part, frac_part) = digits_str.split_at(split_at);
    let sign = if negative { "-" } else { "" };
    format!("{sign}{int_part}.{frac_part}")
}

fn group_thousands(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(b',');
        }
        out.push(*b);
    }
    String::from_utf8(out).expect("input was ascii digits")
}

/// Translates the small subset of Unicode datetime skeleton tokens the
/// builtin supports (`yyyy`, `MM`, `dd`, `HH`, `mm`, `ss`) into `chrono`
/// strftime directives. Anything unrecognized is left untouched so the
/// caller in [`LocaleContext::format_datetime`] can detect the leftover
/// `%`-free text and fall back to ISO 8601.
fn translate_skeleton(pattern: &str) -> String {
    pattern
        .replace("yyyy", "%Y")
        .replace("MM", "%m")
        .replace("dd", "%d")
        .replace("HH", "%H")
        .replace("mm", "%M")
        .replace("ss", "%S")
}

/// Convenience locale resolver reading the host environment, per spec.md
/// §6.4: tries `LC_ALL`, then `LC_MESSAGES`, then `LANG`, normalizes
/// (lowercase, hyphens to underscores), rejects `C`/`POSIX`/empty as
/// "unset", and falls back to `en_US`. This is documented as a convenience
/// only — nothing in `Bundle`/`Localization` calls it implicitly; callers
/// opt in explicitly.
pub fn system_locale() -> String {
    for var in ["LC_ALL", "LC_MESSAGES", "LANG"] {
        if let Ok(value) = std::env::var(var) {
            if let Some(normalized) = normalize_env_locale(&value) {
                return normalized;
            }
        }
    }
    "en_US".to_string()
}

fn normalize_env_locale(raw: &str) -> Option<String> {
    // Environment locale strings may carry an encoding suffix (`en_US.UTF-8`)
    // or a modifier (`en_US@euro`); only the locale identifier itself
    // matters here.
    let stripped = raw.split(['.', '@']).next().unwrap_or("");
    let normalized = stripped.trim().to_lowercase().replace('-', "_");
    if normalized.is_empty() || normalized == "c" || normalized == "posix" {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_rejects_unset_env_locales() {
        assert_eq!(normalize_env_locale("en-US"), Some("en_us".to_string()));
        assert_eq!(normalize_env_locale("en_US.UTF-8"), Some("en_us".to_string()));
        assert_eq!(normalize_env_locale("C"), None);
        assert_eq!(normalize_env_locale("POSIX"), None);
        assert_eq!(normalize_env_locale(""), None);
    }

    #[test]
    fn plural_category_for_en() {
        let ctx = LocaleContext::new("en-US").unwrap();
        assert_eq!(ctx.plural_category(1.0), "one");
        assert_eq!(ctx.plural_category(2.0), "other");
    }

    #[test]
    fn grouped_thousands() {
        let opts = NumberFormatOptions { maximum_fraction_digits: Some(0), ..Default::default() };
        assert_eq!(format_grouped(1234567.0, &opts), "1,234,567");
    }

    #[test]
    fn negative_values_group_correctly() {
        let opts = NumberFormatOptions { maximum_fraction_digits: Some(2), ..Default::default() };
        assert_eq!(format_grouped(-1234.5, &opts), "-1,234.5");
    }

    #[test]
    fn currency_formats_with_symbol() {
        let ctx = LocaleContext::new("en-US").unwrap();
        let opts = NumberFormatOptions {
            style: NumberStyle::Currency,
            currency: Some("USD".to_string()),
            maximum_fraction_digits: Some(2),
            minimum_fraction_digits: Some(2),
            ..Default::default()
        };
        assert_eq!(ctx.format_number(42.5, &opts), "$42.50");
    }

    #[test]
    fn unknown_locale_falls_back_to_en_plural_rules() {
        let ctx = LocaleContext::new("xx-Zz-ZZ").unwrap();
        assert_eq!(ctx.plural_category(1.0), "one");
    }

    #[test]
    fn halfway_values_round_half_up_not_banker_style() {
        let opts = NumberFormatOptions { maximum_fraction_digits: Some(0), ..Default::default() };
        assert_eq!(format_grouped(0.5, &opts), "1");
        assert_eq!(format_grouped(-0.5, &opts), "-1");
        assert_eq!(format_grouped(2.5, &opts), "3");
        assert_eq!(format_grouped(1.5, &opts), "2");
    }
}
