// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing entries to handlers and delivering them with retry

use crate::error::DispatchError;
use ebl_adapters::HandlerInvoker;
use ebl_core::{
    convert_entry, Clock, EventContext, EventEntry, IdGen, MatchError, RetryPolicy,
    ScheduledEvent, SubscriptionRegistry, Target,
};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Settings shared by every delivery
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub context: EventContext,
    pub retry: RetryPolicy,
}

/// One entry bound for one handler
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub function_key: String,
    pub entry: EventEntry,
    pub target: Target,
}

/// Outcome of a successful delivery
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationReport {
    pub function_key: String,
    pub event_id: String,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

/// Outcome of a dispatched batch once every invocation has settled
#[derive(Debug, Default)]
pub struct BatchReport {
    pub delivered: Vec<InvocationReport>,
    pub failed: Vec<DispatchError>,
}

impl BatchReport {
    pub fn invocations(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Finds the subscribers for each entry and invokes them
pub struct Dispatcher<I, C, G> {
    registry: Arc<SubscriptionRegistry>,
    invoker: I,
    clock: C,
    ids: G,
    config: Arc<DispatcherConfig>,
}

impl<I: Clone, C: Clone, G: Clone> Clone for Dispatcher<I, C, G> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            invoker: self.invoker.clone(),
            clock: self.clock.clone(),
            ids: self.ids.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<I, C, G> Dispatcher<I, C, G>
where
    I: HandlerInvoker,
    C: Clock,
    G: IdGen,
{
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        invoker: I,
        clock: C,
        ids: G,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            invoker,
            clock,
            ids,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// One invocation per (entry, matching subscriber), in entry order
    pub fn route(&self, entries: &[EventEntry]) -> Result<Vec<Invocation>, MatchError> {
        let buses = self.registry.buses();
        let mut invocations = Vec::new();

        for entry in entries {
            for subscriber in self.registry.subscribers() {
                match subscriber.matches(entry, buses) {
                    Ok(true) => invocations.push(Invocation {
                        function_key: subscriber.function_key.clone(),
                        entry: entry.clone(),
                        target: subscriber.target.clone(),
                    }),
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(
                            function_key = %subscriber.function_key,
                            error = %e,
                            "pattern evaluation failed"
                        );
                        return Err(e);
                    }
                }
            }
        }

        tracing::debug!(
            entries = entries.len(),
            invocations = invocations.len(),
            "routed batch"
        );
        Ok(invocations)
    }

    /// Deliver one entry to one handler.
    ///
    /// The entry is converted once; every attempt sends the same payload.
    pub async fn invoke(
        &self,
        function_key: &str,
        entry: &EventEntry,
        target: &Target,
    ) -> Result<InvocationReport, DispatchError> {
        let delivery = convert_entry(entry, &self.config.context, &self.clock, &self.ids);
        let payload = target.payload(&delivery);
        let event_id = delivery.id().to_string();
        let retry = self.config.retry;

        let mut attempt = 0;
        loop {
            match self.invoker.invoke(function_key, &payload).await {
                Ok(()) => {
                    tracing::info!(function_key, event_id, attempts = attempt + 1, "delivered");
                    return Ok(InvocationReport {
                        function_key: function_key.to_string(),
                        event_id,
                        attempts: attempt + 1,
                    });
                }
                Err(e) if retry.should_retry(attempt) => {
                    tracing::warn!(
                        function_key,
                        event_id,
                        attempt = attempt + 1,
                        max_attempts = retry.max_attempts(),
                        error = %e,
                        "handler failed, retrying"
                    );
                    tokio::time::sleep(retry.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        function_key,
                        event_id,
                        attempts = attempt + 1,
                        error = %e,
                        "handler failed, giving up"
                    );
                    return Err(DispatchError::RetriesExhausted {
                        function_key: function_key.to_string(),
                        attempts: attempt + 1,
                        source: e,
                    });
                }
            }
        }
    }

    /// Fire a scheduled event; no pattern is evaluated
    pub async fn fire(&self, scheduled: &ScheduledEvent) -> Result<InvocationReport, DispatchError> {
        let entry = EventEntry::scheduled(&scheduled.function_key);
        self.invoke(&scheduled.function_key, &entry, &scheduled.target)
            .await
    }

    /// Route a batch and run every invocation concurrently.
    ///
    /// Returns once all invocations have settled; one failing handler
    /// never stops the others.
    pub async fn dispatch(&self, entries: Vec<EventEntry>) -> Result<BatchReport, MatchError> {
        let invocations = self.route(&entries)?;

        let mut tasks = JoinSet::new();
        for invocation in invocations {
            let dispatcher = self.clone();
            tasks.spawn(async move {
                dispatcher
                    .invoke(&invocation.function_key, &invocation.entry, &invocation.target)
                    .await
            });
        }

        let mut report = BatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(delivered)) => report.delivered.push(delivered),
                Ok(Err(e)) => report.failed.push(e),
                Err(e) => {
                    tracing::error!(error = %e, "invocation task failed");
                    report.failed.push(DispatchError::TaskFailed(e.to_string()));
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
