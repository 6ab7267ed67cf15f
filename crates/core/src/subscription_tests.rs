// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bus::ResourceDef;
use crate::clock::FakeClock;
use crate::entry::{convert_entry, EventContext};
use crate::id::SequentialIdGen;
use serde_json::json;
use std::collections::HashMap;

fn functions(value: Value) -> BTreeMap<String, FunctionDef> {
    serde_json::from_value(value).unwrap()
}

fn buses() -> BusRegistry {
    let resources: BTreeMap<String, ResourceDef> = serde_json::from_value(json!({
        "MyBus": {
            "Type": "AWS::Events::EventBus",
            "Properties": { "Name": "my-bus-name" }
        }
    }))
    .unwrap();
    BusRegistry::new(&resources, HashMap::new())
}

fn build(value: Value) -> SubscriptionRegistry {
    SubscriptionRegistry::build(&functions(value), buses()).unwrap()
}

fn delivery(entry: &EventEntry) -> Delivery {
    let context = EventContext {
        account: "000000000000".into(),
        region: "us-east-1".into(),
    };
    convert_entry(entry, &context, &FakeClock::new(), &SequentialIdGen::default())
}

#[test]
fn splits_triggers_into_subscribers_and_schedules() {
    let registry = build(json!({
        "consumer": {
            "command": ["node", "consumer.js"],
            "events": [
                { "eventBridge": { "eventBus": { "Ref": "MyBus" }, "pattern": { "source": ["acme.orders"] } } },
                { "http": { "path": "/ignored" } }
            ]
        },
        "cleanup": {
            "events": [ { "eventBridge": { "schedule": "rate(5 minutes)" } } ]
        }
    }));

    assert_eq!(registry.subscribers().len(), 1);
    let subscriber = &registry.subscribers()[0];
    assert_eq!(subscriber.function_key, "consumer");
    assert_eq!(subscriber.bus, Some(BusReference::Local("MyBus".into())));
    assert!(subscriber.pattern.is_some());

    assert_eq!(registry.scheduled().len(), 1);
    let scheduled = &registry.scheduled()[0];
    assert_eq!(scheduled.function_key, "cleanup");
    assert_eq!(scheduled.expression, "rate(5 minutes)");
    assert_eq!(scheduled.trigger.as_str(), "*/5 * * * *");
    assert_eq!(registry.buses().local_count(), 1);
}

#[test]
fn malformed_and_disabled_schedules_are_dropped() {
    let registry = build(json!({
        "bad": { "events": [ { "eventBridge": { "schedule": "rate(3 fortnights)" } } ] },
        "off": { "events": [ { "eventBridge": { "schedule": "rate(1 hour)", "enabled": false } } ] },
        "good": { "events": [ { "eventBridge": { "schedule": "cron(0 5 * * ? *)" } } ] }
    }));

    let keys: Vec<&str> = registry
        .scheduled()
        .iter()
        .map(|s| s.function_key.as_str())
        .collect();
    assert_eq!(keys, vec!["good"]);
    assert!(registry.subscribers().is_empty());
}

#[test]
fn unsupported_operators_fail_the_build() {
    let result = SubscriptionRegistry::build(
        &functions(json!({
            "numeric": {
                "events": [ { "eventBridge": {
                    "pattern": { "detail": { "amount": [ { "numeric": [">", 10] } ] } }
                } } ]
            }
        })),
        buses(),
    );

    match result {
        Err(RegistryError::UnsupportedOperator {
            function_key,
            operator,
            path,
        }) => {
            assert_eq!(function_key, "numeric");
            assert_eq!(operator, "numeric");
            assert_eq!(path, "detail.amount");
        }
        other => panic!("expected unsupported operator, got {:?}", other),
    }
}

#[test]
fn invalid_patterns_fail_the_build() {
    let result = SubscriptionRegistry::build(
        &functions(json!({
            "broken": { "events": [ { "eventBridge": { "pattern": ["not", "an", "object"] } } ] }
        })),
        buses(),
    );

    let err = result.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidPattern { .. }));
    assert!(err.to_string().contains("broken"));
}

#[test]
fn subscriber_requires_pattern_and_bus() {
    let registry = build(json!({
        "consumer": { "events": [ { "eventBridge": {
            "eventBus": { "Ref": "MyBus" },
            "pattern": { "source": ["acme.orders"] }
        } } ] }
    }));
    let subscriber = &registry.subscribers()[0];
    let buses = registry.buses();

    let on_bus = EventEntry::new("acme.orders").with_bus("my-bus-name");
    assert_eq!(subscriber.matches(&on_bus, buses), Ok(true));

    let other_bus = EventEntry::new("acme.orders").with_bus("billing");
    assert_eq!(subscriber.matches(&other_bus, buses), Ok(false));

    let other_source = EventEntry::new("acme.billing").with_bus("my-bus-name");
    assert_eq!(subscriber.matches(&other_source, buses), Ok(false));
}

#[test]
fn entry_without_bus_skips_the_bus_check() {
    let registry = build(json!({
        "consumer": { "events": [ { "eventBridge": { "eventBus": "orders" } } ] }
    }));
    let subscriber = &registry.subscribers()[0];

    assert_eq!(
        subscriber.matches(&EventEntry::new("anything"), registry.buses()),
        Ok(true)
    );
    assert_eq!(
        subscriber.matches(&EventEntry::new("anything").with_bus(""), registry.buses()),
        Ok(true)
    );
}

#[test]
fn subscriber_without_constraints_matches_everything() {
    let registry = build(json!({ "all": { "events": [ { "eventBridge": {} } ] } }));
    let subscriber = &registry.subscribers()[0];

    let entry = EventEntry::new("x").with_bus("whatever");
    assert_eq!(subscriber.matches(&entry, registry.buses()), Ok(true));
}

#[test]
fn target_defaults_to_the_full_event() {
    let entry = EventEntry::new("acme").with_detail(r#"{"id":7}"#);
    let delivery = delivery(&entry);

    assert_eq!(Target::default().payload(&delivery), delivery.to_value());
}

#[test]
fn target_input_replaces_the_event() {
    let target = Target {
        input: Some(json!({ "fixed": true })),
        input_path: Some("$.detail".into()),
    };
    let delivery = delivery(&EventEntry::new("acme").with_detail("{}"));

    assert_eq!(target.payload(&delivery), json!({ "fixed": true }));
}

#[test]
fn target_input_path_selects_from_the_event() {
    let delivery = delivery(&EventEntry::new("acme").with_detail(r#"{"order":{"id":7}}"#));
    let select = |path: &str| {
        Target {
            input: None,
            input_path: Some(path.into()),
        }
        .payload(&delivery)
    };

    assert_eq!(select("$.detail.order.id"), json!(7));
    assert_eq!(select("$.source"), json!("acme"));
    assert_eq!(select("$"), delivery.to_value());
    assert_eq!(select("$.detail.missing"), Value::Null);
}

#[test]
fn deserializes_target_settings() {
    let registry = build(json!({
        "consumer": { "events": [ { "eventBridge": {
            "input": { "key": "value" },
            "inputPath": "$.detail"
        } } ] }
    }));

    let target = &registry.subscribers()[0].target;
    assert_eq!(target.input, Some(json!({ "key": "value" })));
    assert_eq!(target.input_path.as_deref(), Some("$.detail"));
}
