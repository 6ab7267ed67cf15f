// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker client

use super::protocol::{self, Frame, ProtocolError};
use super::{ChannelError, EntryChannel, EntryReceiver, EntrySender};
use async_trait::async_trait;
use ebl_core::EventEntry;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

/// Wait between attempts to re-establish a lost subscription
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Channel that publishes to and subscribes through a remote broker
#[derive(Clone)]
pub struct TcpChannel {
    addr: String,
    /// Lazily opened publish connection, reused across batches
    publisher: Arc<Mutex<Option<TcpStream>>>,
    reconnect_delay: Duration,
}

impl TcpChannel {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            publisher: Arc::new(Mutex::new(None)),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> Result<TcpStream, ChannelError> {
        TcpStream::connect(&self.addr)
            .await
            .map_err(|source| ChannelError::Connect {
                addr: self.addr.clone(),
                source,
            })
    }

    async fn open_subscription(&self, client_id: &str) -> Result<TcpStream, ChannelError> {
        let mut stream = self.connect().await?;
        let frame = Frame::Subscribe {
            client_id: client_id.to_string(),
        };
        protocol::write_frame(&mut stream, &frame).await?;
        Ok(stream)
    }
}

#[async_trait]
impl EntryChannel for TcpChannel {
    async fn publish(&self, batch: Vec<EventEntry>) -> Result<(), ChannelError> {
        let frame = Frame::Publish { entries: batch };
        let mut publisher = self.publisher.lock().await;

        // One retry on a fresh connection if the cached one went stale
        for attempt in 0..2 {
            if publisher.is_none() {
                *publisher = Some(self.connect().await?);
            }
            let Some(stream) = publisher.as_mut() else {
                continue;
            };
            match protocol::write_frame(stream, &frame).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt == 0 => {
                    tracing::debug!(addr = %self.addr, error = %e, "publish connection lost, reconnecting");
                    *publisher = None;
                }
                Err(e) => {
                    *publisher = None;
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// Returns at once; the subscription is opened in the background and
    /// re-opened under the same id whenever the broker is unreachable
    async fn subscribe(&self, subscriber_id: &str) -> Result<EntryReceiver, ChannelError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = self.clone();
        let client_id = subscriber_id.to_string();
        tokio::spawn(async move { channel.pump(client_id, tx).await });
        Ok(rx)
    }
}

impl TcpChannel {
    /// Forward delivered batches until the receiver is dropped
    async fn pump(self, client_id: String, tx: EntrySender) {
        let mut connected_once = false;
        let mut reported_down = false;
        loop {
            match self.open_subscription(&client_id).await {
                Ok(stream) => {
                    if connected_once {
                        tracing::info!(client_id, addr = %self.addr, "broker subscription restored");
                    } else {
                        tracing::info!(client_id, addr = %self.addr, "broker subscription open");
                    }
                    connected_once = true;
                    reported_down = false;

                    // The write half stays open so the broker keeps the subscription
                    let (mut reader, _writer) = stream.into_split();
                    match forward(&mut reader, &tx).await {
                        Ok(()) => return,
                        Err(e) => {
                            tracing::warn!(client_id, addr = %self.addr, error = %e, "broker subscription lost")
                        }
                    }
                }
                Err(e) if !reported_down => {
                    tracing::warn!(client_id, error = %e, "broker unreachable, retrying");
                    reported_down = true;
                }
                Err(e) => tracing::debug!(client_id, error = %e, "broker still unreachable"),
            }
            if tx.is_closed() {
                return;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }
}

/// Relay deliver frames; `Ok` means the local receiver went away
async fn forward(
    reader: &mut OwnedReadHalf,
    tx: &EntrySender,
) -> Result<(), ProtocolError> {
    loop {
        match protocol::read_frame(reader).await? {
            Frame::Deliver { entries } => {
                if tx.send(entries).is_err() {
                    return Ok(());
                }
            }
            other => tracing::warn!(?other, "unexpected frame from broker"),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
