// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule runner: one task per scheduled event
//!
//! Each task sleeps until the trigger's next local-time firing, then hands a
//! synthesized entry to the dispatcher. Deliveries run on their own task so
//! a slow handler never delays the next firing.

use crate::dispatcher::Dispatcher;
use chrono::NaiveDateTime;
use ebl_adapters::HandlerInvoker;
use ebl_core::{Clock, CronSpec, IdGen, ScheduledEvent};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Next firing strictly after both `now` and the previous firing, and the
/// wait until it
pub fn next_firing(
    trigger: &CronSpec,
    now: NaiveDateTime,
    previous: Option<NaiveDateTime>,
) -> Option<(NaiveDateTime, Duration)> {
    // A timer can wake a hair early; never fire the same minute twice
    let from = previous.map_or(now, |previous| previous.max(now));
    let next = trigger.next_after(from)?;
    let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
    Some((next, wait))
}

/// Fires scheduled events through a dispatcher
pub struct ScheduleRunner<I, C, G> {
    dispatcher: Dispatcher<I, C, G>,
}

impl<I, C, G> ScheduleRunner<I, C, G>
where
    I: HandlerInvoker,
    C: Clock,
    G: IdGen,
{
    pub fn new(dispatcher: Dispatcher<I, C, G>) -> Self {
        Self { dispatcher }
    }

    /// Start one task per scheduled event in the registry
    pub fn spawn_all(&self) -> Vec<JoinHandle<()>> {
        self.dispatcher
            .registry()
            .scheduled()
            .iter()
            .cloned()
            .map(|scheduled| {
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(run_schedule(dispatcher, scheduled))
            })
            .collect()
    }
}

async fn run_schedule<I, C, G>(dispatcher: Dispatcher<I, C, G>, scheduled: ScheduledEvent)
where
    I: HandlerInvoker,
    C: Clock,
    G: IdGen,
{
    let function_key = scheduled.function_key.clone();
    tracing::info!(
        function_key,
        expression = %scheduled.expression,
        cron = %scheduled.trigger,
        "schedule started"
    );

    let mut previous = None;
    loop {
        let now = dispatcher.clock().now_local();
        let Some((next, wait)) = next_firing(&scheduled.trigger, now, previous) else {
            tracing::warn!(function_key, cron = %scheduled.trigger, "schedule never fires again");
            return;
        };
        tracing::debug!(function_key, next = %next, "next firing");

        tokio::time::sleep(wait).await;
        previous = Some(next);

        tracing::info!(function_key, "firing scheduled event");
        let dispatcher = dispatcher.clone();
        let scheduled = scheduled.clone();
        tokio::spawn(async move {
            deliver_scheduled(&dispatcher, &scheduled).await;
        });
    }
}

/// Fire once; returns whether the handler accepted the event
async fn deliver_scheduled<I, C, G>(
    dispatcher: &Dispatcher<I, C, G>,
    scheduled: &ScheduledEvent,
) -> bool
where
    I: HandlerInvoker,
    C: Clock,
    G: IdGen,
{
    match dispatcher.fire(scheduled).await {
        Ok(report) => {
            tracing::debug!(
                function_key = %scheduled.function_key,
                event_id = %report.event_id,
                attempts = report.attempts,
                "scheduled event delivered"
            );
            true
        }
        Err(e) => {
            tracing::error!(
                function_key = %scheduled.function_key,
                expression = %scheduled.expression,
                error = %e,
                "scheduled event dropped"
            );
            false
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
