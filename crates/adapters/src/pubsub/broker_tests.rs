// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::pubsub::{EntryChannel, TcpChannel};
use ebl_core::EventEntry;
use std::time::Duration;

async fn start_broker() -> (String, InMemoryChannel, JoinHandle<()>) {
    let server = BrokerServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let local = server.channel();
    (addr, local, server.spawn())
}

async fn wait_for_subscribers(channel: &InMemoryChannel, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while channel.subscriber_count() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn remote_publish_reaches_local_subscriber() {
    let (addr, local, broker) = start_broker().await;
    let mut rx = local.register("local-dispatcher");

    TcpChannel::new(&addr)
        .publish(vec![EventEntry::new("acme.orders")])
        .await
        .unwrap();

    let batch = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch, vec![EventEntry::new("acme.orders")]);
    broker.abort();
}

#[tokio::test]
async fn local_publish_reaches_remote_subscriber() {
    let (addr, local, broker) = start_broker().await;
    let mut rx = TcpChannel::new(&addr).subscribe("remote").await.unwrap();
    wait_for_subscribers(&local, 1).await;

    local.broadcast(vec![EventEntry::new("acme.billing")]);

    let batch = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch, vec![EventEntry::new("acme.billing")]);
    broker.abort();
}

#[tokio::test]
async fn reconnecting_client_is_not_served_twice() {
    let (addr, local, broker) = start_broker().await;
    let client = TcpChannel::new(&addr);

    let mut first = client.subscribe("dispatcher").await.unwrap();
    wait_for_subscribers(&local, 1).await;
    let mut second = client.subscribe("dispatcher").await.unwrap();

    // Wait until the second connection has taken over the id
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            local.broadcast(vec![EventEntry::new("probe")]);
            if let Ok(Some(_)) = tokio::time::timeout(Duration::from_millis(50), second.recv()).await {
                break;
            }
        }
    })
    .await
    .unwrap();

    local.broadcast(vec![EventEntry::new("once")]);

    let batch = tokio::time::timeout(Duration::from_secs(5), second.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch, vec![EventEntry::new("once")]);
    // Earlier probes may still be in flight to the replaced subscription
    while let Ok(Some(stale)) = tokio::time::timeout(Duration::from_millis(200), first.recv()).await {
        assert_eq!(stale[0].source, "probe");
    }
    assert_eq!(local.subscriber_count(), 1);
    broker.abort();
}

#[tokio::test]
async fn port_probe_detects_listeners() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    assert!(is_port_in_use(&addr).await);
    assert!(!is_port_in_use("127.0.0.1:0").await);
}
