// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn pattern(value: Value) -> FilterPattern {
    FilterPattern::parse(&value).unwrap()
}

fn order_entry(detail: &str) -> EventEntry {
    EventEntry::new("svc.orders")
        .with_detail_type("OrderPlaced")
        .with_detail(detail)
}

#[test]
fn flatten_nested_objects_into_dot_paths() {
    let flat = flatten(&json!({ "a": { "b": 1, "c": { "d": 2 } } }));

    assert_eq!(flat.len(), 2);
    assert_eq!(flat["a.b"], json!(1));
    assert_eq!(flat["a.c.d"], json!(2));
}

#[test]
fn flatten_keeps_arrays_and_scalars_as_leaves() {
    let flat = flatten(&json!({
        "tags": [{ "k": "v" }],
        "at": "2024-01-01T00:00:00Z",
        "empty": {},
        "n": null
    }));

    assert_eq!(flat["tags"], json!([{ "k": "v" }]));
    assert_eq!(flat["at"], json!("2024-01-01T00:00:00Z"));
    assert_eq!(flat["n"], Value::Null);
    assert!(!flat.contains_key("empty"));
    assert!(!flat.contains_key("tags.k"));
}

#[test]
fn flatten_non_object_is_empty() {
    assert!(flatten(&json!([1, 2])).is_empty());
    assert!(flatten(&json!("text")).is_empty());
}

#[test]
fn empty_pattern_matches_everything() {
    let p = pattern(json!({}));
    assert!(p.matches_entry(&EventEntry::new("anything")).unwrap());
    assert!(p.matches_entry(&order_entry("not json")).unwrap());
}

#[test]
fn source_list_is_an_or() {
    let p = pattern(json!({ "source": ["svc.billing", "svc.orders"] }));

    assert!(p.matches_entry(&EventEntry::new("svc.orders")).unwrap());
    assert!(p.matches_entry(&EventEntry::new("svc.billing")).unwrap());
    assert!(!p.matches_entry(&EventEntry::new("svc.shipping")).unwrap());
}

#[test]
fn bare_scalar_source_is_exact_match() {
    let p = pattern(json!({ "source": "svc.orders" }));
    assert!(p.matches_entry(&EventEntry::new("svc.orders")).unwrap());
    assert!(!p.matches_entry(&EventEntry::new("svc.orders.v2")).unwrap());
}

#[test]
fn detail_type_is_skipped_when_entry_has_none() {
    let p = pattern(json!({ "detail-type": ["OrderPlaced"] }));

    assert!(p.matches_entry(&EventEntry::new("svc")).unwrap());
    assert!(p
        .matches_entry(&EventEntry::new("svc").with_detail_type("OrderPlaced"))
        .unwrap());
    assert!(!p
        .matches_entry(&EventEntry::new("svc").with_detail_type("OrderCancelled"))
        .unwrap());
}

#[test]
fn nested_detail_pattern_matches_flattened_detail() {
    let p = pattern(json!({
        "detail": { "customer": { "tier": ["gold", "platinum"] } }
    }));

    assert!(p
        .matches_entry(&order_entry(r#"{"customer":{"tier":"gold","id":7}}"#))
        .unwrap());
    assert!(!p
        .matches_entry(&order_entry(r#"{"customer":{"tier":"bronze"}}"#))
        .unwrap());
    assert!(!p.matches_entry(&order_entry(r#"{"customer":{}}"#)).unwrap());
}

#[test]
fn detail_is_skipped_when_entry_has_no_body() {
    let p = pattern(json!({ "detail": { "amount": [42] } }));
    assert!(p.matches_entry(&EventEntry::new("svc")).unwrap());
}

#[test]
fn detail_filter_fails_on_malformed_body() {
    let p = pattern(json!({ "detail": { "amount": [42] } }));
    assert!(!p.matches_entry(&order_entry("{amount: 42")).unwrap());
}

#[test]
fn scalar_matches_array_membership() {
    let p = pattern(json!({ "detail": { "tags": ["urgent"] } }));

    assert!(p
        .matches_entry(&order_entry(r#"{"tags":["low","urgent"]}"#))
        .unwrap());
    assert!(!p.matches_entry(&order_entry(r#"{"tags":["low"]}"#)).unwrap());
}

#[test]
fn numbers_compare_numerically() {
    let p = pattern(json!({ "detail": { "amount": [42] } }));
    assert!(p.matches_entry(&order_entry(r#"{"amount":42.0}"#)).unwrap());
    assert!(!p.matches_entry(&order_entry(r#"{"amount":"42"}"#)).unwrap());
}

#[parameterized(
    present = { r#"{"amount":42}"#, true, false },
    absent = { r#"{"other":1}"#, false, true },
    explicit_null = { r#"{"amount":null}"#, false, true },
    nested_object_is_not_a_leaf = { r#"{"amount":{"value":1}}"#, false, true },
)]
fn exists_checks_presence(detail: &str, exists_true: bool, exists_false: bool) {
    let wants = pattern(json!({ "detail": { "amount": [{ "exists": true }] } }));
    let forbids = pattern(json!({ "detail": { "amount": [{ "exists": false }] } }));

    assert_eq!(wants.matches_entry(&order_entry(detail)).unwrap(), exists_true);
    assert_eq!(forbids.matches_entry(&order_entry(detail)).unwrap(), exists_false);
}

#[test]
fn bare_exists_operator_outside_list_is_a_leaf() {
    let p = pattern(json!({ "detail": { "amount": { "exists": true } } }));

    assert_eq!(
        p.detail.as_ref().unwrap()["amount"],
        PatternNode::Leaf(Leaf(vec![Alternative::Exists(true)]))
    );
    assert!(p.matches_entry(&order_entry(r#"{"amount":1}"#)).unwrap());
}

#[test]
fn null_literal_matches_explicit_null_only() {
    let p = pattern(json!({ "detail": { "coupon": [null] } }));

    assert!(p.matches_entry(&order_entry(r#"{"coupon":null}"#)).unwrap());
    assert!(!p.matches_entry(&order_entry(r#"{"other":1}"#)).unwrap());
}

#[parameterized(
    matches_prefix = { r#"{"sku":"ab-123"}"#, true },
    exact_prefix = { r#"{"sku":"ab"}"#, true },
    other_prefix = { r#"{"sku":"ba-123"}"#, false },
    number = { r#"{"sku":12}"#, false },
    array = { r#"{"sku":["ab-1"]}"#, false },
    absent = { r#"{}"#, false },
)]
fn prefix_requires_string_with_prefix(detail: &str, expected: bool) {
    let p = pattern(json!({ "detail": { "sku": [{ "prefix": "ab" }] } }));
    assert_eq!(p.matches_entry(&order_entry(detail)).unwrap(), expected);
}

#[parameterized(
    excluded_value = { r#"{"state":"cancelled"}"#, false },
    other_value = { r#"{"state":"open"}"#, true },
    absent = { r#"{}"#, true },
)]
fn anything_but_negates_literal(detail: &str, expected: bool) {
    let p = pattern(json!({ "detail": { "state": [{ "anything-but": "cancelled" }] } }));
    assert_eq!(p.matches_entry(&order_entry(detail)).unwrap(), expected);
}

#[test]
fn anything_but_list_excludes_every_member() {
    let p = pattern(json!({ "detail": { "state": [{ "anything-but": ["a", "b"] }] } }));

    assert!(!p.matches_entry(&order_entry(r#"{"state":"a"}"#)).unwrap());
    assert!(!p.matches_entry(&order_entry(r#"{"state":"b"}"#)).unwrap());
    assert!(p.matches_entry(&order_entry(r#"{"state":"c"}"#)).unwrap());
}

#[test]
fn anything_but_negates_prefix() {
    let p = pattern(json!({
        "source": [{ "anything-but": { "prefix": "aws." } }]
    }));

    assert!(!p.matches_entry(&EventEntry::new("aws.ec2")).unwrap());
    assert!(p.matches_entry(&EventEntry::new("svc.orders")).unwrap());
}

#[test]
fn anything_but_negates_exists() {
    let p = pattern(json!({
        "detail": { "amount": [{ "anything-but": { "exists": true } }] }
    }));

    assert!(p.matches_entry(&order_entry(r#"{}"#)).unwrap());
    assert!(!p.matches_entry(&order_entry(r#"{"amount":1}"#)).unwrap());
}

#[test]
fn resources_match_by_membership() {
    let p = pattern(json!({ "resources": ["arn:aws:s3:::a"] }));

    let with = EventEntry::new("svc").with_resources(vec![
        "arn:aws:s3:::b".to_string(),
        "arn:aws:s3:::a".to_string(),
    ]);
    assert!(p.matches_entry(&with).unwrap());
    assert!(!p.matches_entry(&EventEntry::new("svc")).unwrap());
}

#[parameterized(
    numeric = { json!({ "detail": { "amount": [{ "numeric": [">", 0] }] } }), "numeric" },
    cidr = { json!({ "detail": { "ip": [{ "cidr": "10.0.0.0/24" }] } }), "cidr" },
    suffix_outside_list = { json!({ "detail": { "file": { "suffix": ".png" } } }), "suffix" },
    unknown = { json!({ "source": [{ "regex": ".*" }] }), "regex" },
    inside_anything_but = { json!({ "source": [{ "anything-but": { "numeric": ["<", 1] } }] }), "numeric" },
)]
fn unsupported_operator_is_a_loud_error(value: Value, operator: &str) {
    let p = pattern(value);

    let err = p.matches_entry(&order_entry(r#"{"amount":1}"#)).unwrap_err();
    match err {
        MatchError::UnsupportedOperator { operator: op, .. } => assert_eq!(op, operator),
    }
}

#[test]
fn unsupported_operator_reports_its_path() {
    let p = pattern(json!({ "detail": { "order": { "total": [{ "numeric": [">", 1] }] } } }));

    assert_eq!(
        p.unsupported_operators(),
        vec![("detail.order.total".to_string(), "numeric".to_string())]
    );
}

#[test]
fn unknown_top_level_fields_are_recorded() {
    let p = pattern(json!({ "account": ["1"], "source": ["x"] }));
    assert_eq!(p.ignored_fields, vec!["account".to_string()]);
}

#[test]
fn parse_rejects_invalid_shapes() {
    assert!(matches!(
        FilterPattern::parse(&json!(["source"])),
        Err(PatternError::NotAnObject(_))
    ));
    assert!(matches!(
        FilterPattern::parse(&json!({ "source": { "nested": 1 } })),
        Err(PatternError::InvalidLeaf { .. })
    ));
    assert!(matches!(
        FilterPattern::parse(&json!({ "detail": { "a": [{ "exists": "yes" }] } })),
        Err(PatternError::InvalidOperand { .. })
    ));
    assert!(matches!(
        FilterPattern::parse(&json!({ "detail": { "a": [{ "prefix": 1 }] } })),
        Err(PatternError::InvalidOperand { .. })
    ));
}

// Property-based tests
use proptest::prelude::*;

proptest! {
    #[test]
    fn anything_but_is_the_negation_of_its_operand(
        value in prop::option::of("[a-c]{1,2}"),
        excluded in "[a-c]{1,2}",
    ) {
        let field = value.clone().map(Value::String);
        let plain = Alternative::Scalar(Value::String(excluded.clone()));
        let negated = Alternative::AnythingBut(vec![plain.clone()]);

        prop_assert_eq!(
            negated.evaluate(field.as_ref(), "f").unwrap(),
            !plain.evaluate(field.as_ref(), "f").unwrap()
        );
    }

    #[test]
    fn prefix_agrees_with_starts_with(value in "[ab]{0,4}") {
        let prefix = Alternative::Prefix("ab".to_string());
        let field = Value::String(value.clone());
        prop_assert_eq!(prefix.evaluate(Some(&field), "f").unwrap(), value.starts_with("ab"));
    }
}
