//! FTL function registry (spec.md §4.6 `FUNCTION_REGISTRY`).
//!
//! The reference inspects a Python callable's signature at registration
//! time to build its parameter-name map and decide whether to inject the
//! locale. Rust closures carry no such runtime reflection, so registration
//! here takes an explicit [`FunctionSpec`] describing that same metadata
//! up front — a deliberate adaptation, not a missing feature (see
//! `DESIGN.md`). Everything downstream of that difference — freeze/copy,
//! camelCase<->snake_case parameter mapping, underscore-stripping collision
//! detection, `should_inject_locale` — mirrors `function_bridge.py` as
//! directly as the signature difference allows.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::ResolverError;
use crate::types::FluentValue;

/// The signature every registered function implements: positional
/// arguments (already locale-injected as the first element when
/// `requires_locale` is set), named arguments, and the active locale string
/// for informational use. Returns the formatted fragment or a resolver
/// error, which the caller degrades into a fallback placeholder rather
/// than propagating (spec.md §4.7).
pub type FluentFunction =
    Arc<dyn Fn(&[FluentValue], &HashMap<String, FluentValue>) -> Result<FluentValue, String> + Send + Sync>;

/// Declared metadata accompanying a function registration, replacing the
/// reference's runtime `inspect.signature()` call.
#[derive(Clone)]
pub struct FunctionSpec {
    /// Rust parameter identifiers, in declaration order, each mapped to the
    /// camelCase name FTL call sites use for named arguments (e.g.
    /// `minimum_fraction_digits` -> `minimumFractionDigits`).
    pub param_names: Vec<String>,
    pub requires_locale: bool,
}

impl FunctionSpec {
    pub fn new(param_names: &[&str], requires_locale: bool) -> Self {
        FunctionSpec {
            param_names: param_names.iter().map(|s| s.to_string()).collect(),
            requires_locale,
        }
    }
}

#[derive(Clone)]
struct Registration {
    func: FluentFunction,
    spec: FunctionSpec,
}

/// Metadata returned by [`FunctionRegistry::get_function_info`]: the FTL
/// call name, the internal name the registry dispatches under (identical to
/// `ftl_name` here, since registration has no separate Rust-side alias the
/// way the reference's inspected callable name can differ from its FTL
/// name), and the ordered camelCase -> snake_case parameter mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub ftl_name: String,
    pub internal_name: String,
    pub requires_locale: bool,
    pub param_mapping: Vec<(String, String)>,
}

/// Converts a Rust `snake_case` parameter name to the camelCase form FTL
/// call sites use, stripping a single leading underscore first so
/// `_test_param` and `test_param` are recognized as the same logical name
/// (and therefore collide) the way the reference's collision check does.
fn to_camel_case(param: &str) -> String {
    let stripped = param.strip_prefix('_').unwrap_or(param);
    let mut out = String::with_capacity(stripped.len());
    let mut upcase_next = false;
    for ch in stripped.chars() {
        if ch == '_' {
            upcase_next = true;
            continue;
        }
        if upcase_next {
            out.extend(ch.to_uppercase());
            upcase_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("cannot modify a frozen registry; call copy() first or use create_default_registry()")]
    Frozen,
    #[error("parameter name collision: two parameters both map to \"{0}\"")]
    ParameterCollision(String),
}

/// Maps FTL function names to implementations, with freeze/copy semantics
/// so a base registry (e.g. the builtins) can be shared read-only and
/// extended per-bundle via a cheap copy (spec.md §4.6).
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Registration>,
    frozen: bool,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        FunctionRegistry::default()
    }

    /// A registry pre-populated with metadata for the three builtins
    /// (spec.md §4.6). Their actual dispatch is a fast path inside the
    /// resolver (`resolve_builtin`), which never reaches `call()` for these
    /// names — these entries exist purely so `get_function_info` and
    /// `should_inject_locale` report accurate metadata for them too, the
    /// same way the reference's bridge describes builtins alongside
    /// user-registered functions.
    pub fn with_builtins() -> Self {
        let mut registry = FunctionRegistry::new();
        let unreachable: FluentFunction =
            Arc::new(|_, _| Err("builtin functions are dispatched directly by the resolver".to_string()));
        registry
            .register(
                "NUMBER",
                unreachable.clone(),
                FunctionSpec::new(
                    &["value", "style", "currency", "minimum_fraction_digits", "maximum_fraction_digits", "use_grouping"],
                    true,
                ),
            )
            .expect("builtin parameter names never collide");
        registry
            .register(
                "DATETIME",
                unreachable.clone(),
                FunctionSpec::new(&["value", "pattern", "date_style", "time_style"], true),
            )
            .expect("builtin parameter names never collide");
        registry
            .register("CURRENCY", unreachable, FunctionSpec::new(&["value", "currency"], true))
            .expect("builtin parameter names never collide");
        registry
    }

    pub fn frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns a mutable copy. The copy is never frozen, even if `self` is —
    /// mirrors the reference's `copy()` contract used to extend a frozen
    /// default registry per bundle.
    pub fn copy(&self) -> Self {
        FunctionRegistry { functions: self.functions.clone(), frozen: false }
    }

    pub fn register(
        &mut self,
        ftl_name: &str,
        func: FluentFunction,
        spec: FunctionSpec,
    ) -> Result<(), RegistrationError> {
        if self.frozen {
            return Err(RegistrationError::Frozen);
        }
        let mut seen = HashMap::new();
        for param in &spec.param_names {
            let camel = to_camel_case(param);
            if let Some(previous) = seen.insert(camel.clone(), param.clone()) {
                let _ = previous;
                return Err(RegistrationError::ParameterCollision(camel));
            }
        }
        self.functions.insert(ftl_name.to_string(), Registration { func, spec });
        Ok(())
    }

    pub fn contains(&self, ftl_name: &str) -> bool {
        self.functions.contains_key(ftl_name)
    }

    pub fn get(&self, ftl_name: &str) -> Option<&FluentFunction> {
        self.functions.get(ftl_name).map(|r| &r.func)
    }

    pub fn should_inject_locale(&self, ftl_name: &str) -> bool {
        self.functions.get(ftl_name).map(|r| r.spec.requires_locale).unwrap_or(false)
    }

    pub fn get_expected_positional_args(&self, ftl_name: &str) -> Option<usize> {
        self.functions.get(ftl_name).map(|r| r.spec.param_names.len())
    }

    /// Resolves a named argument's camelCase FTL name back to the Rust
    /// parameter name it was declared under, for diagnostics and for the
    /// resolver's named-argument binding.
    pub fn param_name_for(&self, ftl_name: &str, camel: &str) -> Option<String> {
        let reg = self.functions.get(ftl_name)?;
        reg.spec.param_names.iter().find(|p| to_camel_case(p) == camel).cloned()
    }

    /// Introspects a registered function's metadata: its FTL name, its
    /// internal (Rust) name, and its parameter mapping sorted by the FTL
    /// camelCase name. Mirrors `function_bridge.py`'s `get_function_info`,
    /// which a caller uses to discover what a function expects without
    /// invoking it.
    pub fn get_function_info(&self, ftl_name: &str) -> Option<FunctionInfo> {
        let reg = self.functions.get(ftl_name)?;
        let mut param_mapping: Vec<(String, String)> =
            reg.spec.param_names.iter().map(|p| (to_camel_case(p), p.clone())).collect();
        param_mapping.sort_by(|a, b| a.0.cmp(&b.0));
        Some(FunctionInfo {
            ftl_name: ftl_name.to_string(),
            internal_name: ftl_name.to_string(),
            requires_locale: reg.spec.requires_locale,
            param_mapping,
        })
    }

    pub fn call(
        &self,
        ftl_name: &str,
        positional: &[FluentValue],
        named: &HashMap<String, FluentValue>,
    ) -> Result<FluentValue, ResolverError> {
        let reg = self
            .functions
            .get(ftl_name)
            .ok_or_else(|| ResolverError::UnknownFunction(ftl_name.to_string()))?;
        (reg.func)(positional, named).map_err(|message| ResolverError::FunctionCall {
            function: ftl_name.to_string(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy(_p: &[FluentValue], _n: &HashMap<String, FluentValue>) -> Result<FluentValue, String> {
        Ok(FluentValue::String("ok".to_string()))
    }

    #[test]
    fn frozen_registry_rejects_registration() {
        let mut reg = FunctionRegistry::new();
        reg.freeze();
        let err = reg
            .register("FUNC", Arc::new(dummy), FunctionSpec::new(&["value"], false))
            .unwrap_err();
        assert_eq!(err, RegistrationError::Frozen);
    }

    #[test]
    fn parameter_collision_after_underscore_stripping_rejected() {
        let mut reg = FunctionRegistry::new();
        let err = reg
            .register("COLLIDE", Arc::new(dummy), FunctionSpec::new(&["_test_param", "test_param"], false))
            .unwrap_err();
        assert_eq!(err, RegistrationError::ParameterCollision("testParam".to_string()));
    }

    #[test]
    fn copy_of_frozen_registry_is_mutable_and_independent() {
        let mut reg = FunctionRegistry::new();
        reg.register("FUNC1", Arc::new(dummy), FunctionSpec::new(&["value"], false)).unwrap();
        reg.freeze();

        let mut copy = reg.copy();
        assert!(!copy.frozen());
        copy.register("FUNC2", Arc::new(dummy), FunctionSpec::new(&["value"], false)).unwrap();

        assert!(copy.contains("FUNC1"));
        assert!(copy.contains("FUNC2"));
        assert!(reg.contains("FUNC1"));
        assert!(!reg.contains("FUNC2"));
    }

    #[test]
    fn should_inject_locale_false_for_missing_function() {
        let reg = FunctionRegistry::new();
        assert!(!reg.should_inject_locale("NONEXISTENT"));
    }

    #[test]
    fn should_inject_locale_reflects_spec() {
        let mut reg = FunctionRegistry::new();
        reg.register("MYFORMAT", Arc::new(dummy), FunctionSpec::new(&["value", "locale_code"], true)).unwrap();
        assert!(reg.should_inject_locale("MYFORMAT"));
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(to_camel_case("minimum_fraction_digits"), "minimumFractionDigits");
        assert_eq!(to_camel_case("_test_param"), "testParam");
        assert_eq!(to_camel_case("value"), "value");
    }

    #[test]
    fn get_function_info_reports_param_mapping_and_locale_flag() {
        let registry = FunctionRegistry::with_builtins();
        let info = registry.get_function_info("NUMBER").unwrap();
        assert_eq!(info.ftl_name, "NUMBER");
        assert_eq!(info.internal_name, "NUMBER");
        assert!(info.requires_locale);
        assert_eq!(
            info.param_mapping,
            vec![
                ("currency".to_string(), "currency".to_string()),
                ("maximumFractionDigits".to_string(), "maximum_fraction_digits".to_string()),
                ("minimumFractionDigits".to_string(), "minimum_fraction_digits".to_string()),
                ("style".to_string(), "style".to_string()),
                ("useGrouping".to_string(), "use_grouping".to_string()),
                ("value".to_string(), "value".to_string()),
            ]
        );
    }

    #[test]
    fn get_function_info_none_for_unregistered_function() {
        let registry = FunctionRegistry::new();
        assert!(registry.get_function_info("MISSING").is_none());
    }
}
