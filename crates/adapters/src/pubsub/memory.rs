// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process broadcast channel

use super::{ChannelError, EntryChannel, EntryReceiver, EntrySender};
use async_trait::async_trait;
use ebl_core::EventEntry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Broadcast channel backed by one unbounded queue per subscriber
#[derive(Clone, Default)]
pub struct InMemoryChannel {
    subscribers: Arc<RwLock<HashMap<String, EntrySender>>>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber, dropping the sender of any previous one
    pub fn register(&self, subscriber_id: &str) -> EntryReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let replaced = self
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(subscriber_id.to_string(), tx);
        if replaced.is_some() {
            tracing::debug!(subscriber_id, "replaced existing subscription");
        }
        rx
    }

    /// Queue `batch` for every subscriber; returns how many received it
    pub fn broadcast(&self, batch: Vec<EventEntry>) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        {
            let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            for (id, tx) in subs.iter() {
                if tx.send(batch.clone()).is_ok() {
                    delivered += 1;
                } else {
                    closed.push(id.clone());
                }
            }
        }

        if !closed.is_empty() {
            let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
            for id in closed {
                // Re-check: the id may have been re-registered meanwhile
                if subs.get(&id).is_some_and(|tx| tx.is_closed()) {
                    subs.remove(&id);
                    tracing::debug!(subscriber_id = %id, "pruned closed subscription");
                }
            }
        }
        delivered
    }

    /// Get count of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl EntryChannel for InMemoryChannel {
    async fn publish(&self, batch: Vec<EventEntry>) -> Result<(), ChannelError> {
        let entries = batch.len();
        let subscribers = self.broadcast(batch);
        tracing::trace!(entries, subscribers, "batch broadcast");
        Ok(())
    }

    async fn subscribe(&self, subscriber_id: &str) -> Result<EntryReceiver, ChannelError> {
        Ok(self.register(subscriber_id))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
