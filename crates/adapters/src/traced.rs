// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::invoke::{HandlerInvoker, InvokeError};
use crate::pubsub::{ChannelError, EntryChannel, EntryReceiver};
use async_trait::async_trait;
use ebl_core::EventEntry;
use serde_json::Value;
use tracing::Instrument;

/// Wrapper that adds tracing to any HandlerInvoker
#[derive(Clone)]
pub struct TracedInvoker<I> {
    inner: I,
}

impl<I> TracedInvoker<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<I: HandlerInvoker> HandlerInvoker for TracedInvoker<I> {
    async fn invoke(&self, function_key: &str, payload: &Value) -> Result<(), InvokeError> {
        let span = tracing::info_span!("handler.invoke", function_key);

        async {
            tracing::debug!(payload_len = payload.to_string().len(), "invoking");

            let start = std::time::Instant::now();
            let result = self.inner.invoke(function_key, payload).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "handler succeeded"),
                Err(e) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "handler failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any EntryChannel
#[derive(Clone)]
pub struct TracedChannel<C> {
    inner: C,
}

impl<C> TracedChannel<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: EntryChannel> EntryChannel for TracedChannel<C> {
    async fn publish(&self, batch: Vec<EventEntry>) -> Result<(), ChannelError> {
        let entries = batch.len();
        let result = self
            .inner
            .publish(batch)
            .instrument(tracing::debug_span!("channel.publish", entries))
            .await;

        match &result {
            Ok(()) => tracing::debug!(entries, "batch published"),
            Err(e) => tracing::error!(entries, error = %e, "publish failed"),
        }
        result
    }

    async fn subscribe(&self, subscriber_id: &str) -> Result<EntryReceiver, ChannelError> {
        let result = self.inner.subscribe(subscriber_id).await;
        match &result {
            Ok(_) => tracing::info!(subscriber_id, "subscribed"),
            Err(e) => tracing::error!(subscriber_id, error = %e, "subscribe failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
