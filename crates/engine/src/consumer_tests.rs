// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::dispatcher::DispatcherConfig;
use ebl_adapters::{FakeInvoker, InMemoryChannel};
use ebl_core::{
    BusRegistry, EventContext, EventEntry, FakeClock, FunctionDef, RetryPolicy, SequentialIdGen,
    SubscriptionRegistry,
};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

fn consumer(functions: serde_json::Value, invoker: &FakeInvoker) -> Consumer<FakeInvoker, FakeClock, SequentialIdGen> {
    let functions: BTreeMap<String, FunctionDef> = serde_json::from_value(functions).unwrap();
    let registry = SubscriptionRegistry::build(&functions, BusRegistry::default()).unwrap();
    Consumer::new(Dispatcher::new(
        Arc::new(registry),
        invoker.clone(),
        FakeClock::new(),
        SequentialIdGen::default(),
        DispatcherConfig {
            context: EventContext {
                account: "000000000000".into(),
                region: "us-east-1".into(),
            },
            retry: RetryPolicy::new(0, Duration::ZERO),
        },
    ))
}

async fn wait_for_calls(invoker: &FakeInvoker, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while invoker.calls().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn published_batches_reach_handlers() {
    let invoker = FakeInvoker::new();
    let channel = InMemoryChannel::new();
    consumer(
        json!({ "orders": { "events": [ { "eventBridge": { "pattern": { "source": ["acme.orders"] } } } ] } }),
        &invoker,
    )
    .start(&channel, "dispatcher")
    .await
    .unwrap();

    channel
        .publish(vec![EventEntry::new("acme.orders"), EventEntry::new("acme.billing")])
        .await
        .unwrap();
    channel
        .publish(vec![EventEntry::new("acme.orders")])
        .await
        .unwrap();

    wait_for_calls(&invoker, 2).await;
    assert!(invoker.calls().iter().all(|c| c.payload["source"] == "acme.orders"));
}

#[tokio::test]
async fn failing_handler_does_not_stall_the_channel() {
    let invoker = FakeInvoker::new();
    invoker.fail_always("broken");
    let channel = InMemoryChannel::new();
    consumer(
        json!({
            "broken": { "events": [ { "eventBridge": {} } ] },
            "healthy": { "events": [ { "eventBridge": {} } ] }
        }),
        &invoker,
    )
    .start(&channel, "dispatcher")
    .await
    .unwrap();

    channel.publish(vec![EventEntry::new("one")]).await.unwrap();
    channel.publish(vec![EventEntry::new("two")]).await.unwrap();

    wait_for_calls(&invoker, 4).await;
    assert_eq!(invoker.calls_for("healthy").len(), 2);
}

#[tokio::test]
async fn consumer_stops_when_channel_closes() {
    let invoker = FakeInvoker::new();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(consumer(json!({}), &invoker).run(rx));

    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}
