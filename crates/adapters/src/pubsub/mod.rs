// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast channel between ingestion and dispatch
//!
//! Every subscriber receives every published batch. Subscribers are keyed
//! by id; subscribing again with a live id replaces the earlier
//! subscription, so a reconnecting dispatcher never sees a batch twice.

mod broker;
mod client;
mod memory;
pub mod protocol;

pub use broker::{is_port_in_use, BrokerServer};
pub use client::TcpChannel;
pub use memory::InMemoryChannel;

use async_trait::async_trait;
use ebl_core::EventEntry;
use protocol::ProtocolError;
use thiserror::Error;
use tokio::sync::mpsc;

/// Sender half of a subscription
pub type EntrySender = mpsc::UnboundedSender<Vec<EventEntry>>;
/// Receiver half of a subscription
pub type EntryReceiver = mpsc::UnboundedReceiver<Vec<EventEntry>>;

/// Errors from publishing or subscribing
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("broker unreachable at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A publish/subscribe channel carrying entry batches
#[async_trait]
pub trait EntryChannel: Clone + Send + Sync + 'static {
    /// Hand a batch to every current subscriber without waiting for delivery
    async fn publish(&self, batch: Vec<EventEntry>) -> Result<(), ChannelError>;

    /// Register `subscriber_id`, replacing any live subscription with that id
    async fn subscribe(&self, subscriber_id: &str) -> Result<EntryReceiver, ChannelError>;
}
