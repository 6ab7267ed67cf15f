// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel consumer: feeds every received batch to the dispatcher

use crate::dispatcher::Dispatcher;
use ebl_adapters::{ChannelError, EntryChannel, EntryReceiver, HandlerInvoker};
use ebl_core::{Clock, IdGen};
use tokio::task::JoinHandle;

pub struct Consumer<I, C, G> {
    dispatcher: Dispatcher<I, C, G>,
}

impl<I, C, G> Consumer<I, C, G>
where
    I: HandlerInvoker,
    C: Clock,
    G: IdGen,
{
    pub fn new(dispatcher: Dispatcher<I, C, G>) -> Self {
        Self { dispatcher }
    }

    /// Subscribe to `channel` as `subscriber_id` and consume in the background
    pub async fn start<Ch: EntryChannel>(
        self,
        channel: &Ch,
        subscriber_id: &str,
    ) -> Result<JoinHandle<()>, ChannelError> {
        let receiver = channel.subscribe(subscriber_id).await?;
        Ok(tokio::spawn(self.run(receiver)))
    }

    /// Dispatch batches until the channel closes.
    ///
    /// Each batch is dispatched on its own task so the channel keeps
    /// draining while handlers retry.
    pub async fn run(self, mut receiver: EntryReceiver) {
        while let Some(batch) = receiver.recv().await {
            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                let entries = batch.len();
                match dispatcher.dispatch(batch).await {
                    Ok(report) => tracing::debug!(
                        entries,
                        delivered = report.delivered.len(),
                        failed = report.failed.len(),
                        "batch settled"
                    ),
                    Err(e) => tracing::error!(entries, error = %e, "dropping batch"),
                }
            });
        }
        tracing::info!("channel closed, consumer stopping");
    }
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
