//! Integration coverage across the parse -> validate -> serialize pipeline,
//! as opposed to the per-module unit tests colocated with each stage.

use std::collections::HashSet;

use fluent_syntax::ast::Entry;
use fluent_syntax::diagnostics::LineOffsetCache;
use fluent_syntax::{parse, serializer, validator};

#[test]
fn well_formed_resource_parses_clean_and_round_trips_semantically() {
    let source = "\
-brand-name = Firefox
welcome = Welcome to { -brand-name }!
    .tooltip = Get started with { -brand-name }
emails = { $count ->
    [one] one email
   *[other] { $count } emails
}
";
    let resource = parse(source);
    assert!(resource.entries.iter().all(|e| !matches!(e, Entry::Junk(_))));

    let line_cache = LineOffsetCache::new(source);
    let result = validator::validate(&resource, &HashSet::new(), &HashSet::new(), &line_cache);
    assert!(result.is_valid, "unexpected errors: {:?}", result.errors);

    let serialized = serializer::serialize(&resource);
    let reparsed = parse(&serialized);
    assert_eq!(reparsed.entries.len(), resource.entries.len());
    assert!(reparsed.entries.iter().all(|e| !matches!(e, Entry::Junk(_))));
}

#[test]
fn malformed_entry_becomes_junk_without_poisoning_the_rest_of_the_resource() {
    let source = "good = fine\n= missing identifier\nalso_good = still parses\n";
    let resource = parse(source);

    let junk_count = resource.entries.iter().filter(|e| matches!(e, Entry::Junk(_))).count();
    assert_eq!(junk_count, 1);

    let message_ids: Vec<&str> = resource
        .entries
        .iter()
        .filter_map(|e| match e {
            Entry::Message(m) => Some(m.id.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(message_ids, vec!["good", "also_good"]);
}

#[test]
fn circular_term_references_are_flagged_by_the_validator() {
    let source = "-a = { -b }\n-b = { -a }\n";
    let resource = parse(source);
    let line_cache = LineOffsetCache::new(source);
    let result = validator::validate(&resource, &HashSet::new(), &HashSet::new(), &line_cache);
    assert!(result.is_valid, "circular references are reported as warnings, not errors");
    assert!(!result.warnings.is_empty());
}
