//! End-to-end scenarios exercising the public `Bundle`/`Localization` API
//! together, rather than any one module in isolation.

use std::collections::HashMap;

use fluent_bundle::{Bundle, BundleOptions, FluentNumber, FluentValue, Localization};

fn bundle_without_isolation(locale: &str) -> Bundle {
    let options = BundleOptions { use_isolating: false, ..BundleOptions::default() };
    Bundle::new(locale, options).unwrap()
}

#[test]
fn plural_selection_picks_exact_variant_or_falls_back_to_plural_category() {
    let bundle = bundle_without_isolation("en-US");
    bundle
        .add_resource(
            "emails = { $count ->\n    [one] one email\n   *[other] { $count } emails\n}\n",
        )
        .unwrap();

    let mut args = HashMap::new();
    args.insert("count".to_string(), FluentValue::Number(FluentNumber::Int(1)));
    let (value, errors) = bundle.format_value("emails", Some(&args));
    assert_eq!(value, "one email");
    assert!(errors.is_empty());

    args.insert("count".to_string(), FluentValue::Number(FluentNumber::Int(0)));
    let (value, errors) = bundle.format_value("emails", Some(&args));
    assert_eq!(value, "0 emails");
    assert!(errors.is_empty());

    args.insert("count".to_string(), FluentValue::Number(FluentNumber::Int(5)));
    let (value, errors) = bundle.format_value("emails", Some(&args));
    assert_eq!(value, "5 emails");
    assert!(errors.is_empty());
}

#[test]
fn exact_numeric_decimal_variant_wins_over_plural_category() {
    let bundle = bundle_without_isolation("en-US");
    bundle
        .add_resource("rate = { $v ->\n    [0.1] ten percent\n   *[other] { $v }\n}\n")
        .unwrap();

    let mut args = HashMap::new();
    args.insert("v".to_string(), FluentValue::Number(FluentNumber::decimal(0.1)));
    let (value, errors) = bundle.format_value("rate", Some(&args));
    assert_eq!(value, "ten percent");
    assert!(errors.is_empty());
}

#[test]
fn mutually_referencing_messages_degrade_instead_of_looping() {
    let bundle = bundle_without_isolation("en-US");
    bundle.add_resource("a = { b }\nb = { a }\n").unwrap();

    let (value, errors) = bundle.format_value("a", None);
    assert!(value.contains("{a}") || value.contains("{b}"), "got {value:?}");
    assert!(!errors.is_empty());
}

#[test]
fn missing_variable_degrades_to_placeholder_with_one_error() {
    let bundle = bundle_without_isolation("en-US");
    bundle.add_resource("g = Hello, { $name }!\n").unwrap();

    let (value, errors) = bundle.format_value("g", None);
    assert_eq!(value, "Hello, {$name}!");
    assert_eq!(errors.len(), 1);
}

#[test]
fn localization_falls_back_across_locales_in_order() {
    let loc = Localization::new(
        ["lv", "en"],
        |locale| match locale {
            "lv" => vec!["hello = Sveiki, { $name }!\n".to_string()],
            "en" => vec![
                "hello = Hello, { $name }!\n".to_string(),
                "goodbye = Goodbye!\n".to_string(),
            ],
            _ => vec![],
        },
        BundleOptions { use_isolating: false, ..BundleOptions::default() },
    );

    let mut args = HashMap::new();
    args.insert("name".to_string(), FluentValue::String("Anna".to_string()));
    let (value, errors) = loc.format_value("hello", Some(&args));
    assert_eq!(value, "Sveiki, Anna!");
    assert!(errors.is_empty());

    let (value, errors) = loc.format_value("goodbye", None);
    assert_eq!(value, "Goodbye!");
    assert!(errors.is_empty());
}

#[test]
fn repeated_fresh_nan_floats_collapse_to_a_single_cache_entry() {
    let bundle = bundle_without_isolation("en-US");
    bundle.add_resource("m = { $v ->\n   *[other] not a number\n}\n").unwrap();

    for _ in 0..100 {
        let mut args = HashMap::new();
        args.insert("v".to_string(), FluentValue::Number(FluentNumber::Float(f64::NAN)));
        bundle.format_value("m", Some(&args));
    }

    assert_eq!(bundle.cache_len(), 1);
}
