// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP broker sharing one logical channel across processes

use super::memory::InMemoryChannel;
use super::protocol::{self, Frame, ProtocolError};
use super::ChannelError;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Whether something is already listening on `addr`
pub async fn is_port_in_use(addr: &str) -> bool {
    match TcpListener::bind(addr).await {
        Ok(_) => false,
        Err(e) => e.kind() == std::io::ErrorKind::AddrInUse,
    }
}

/// Accepts broker clients and relays batches between them.
///
/// Local publishers and subscribers can bypass TCP through [`channel`].
///
/// [`channel`]: BrokerServer::channel
pub struct BrokerServer {
    listener: TcpListener,
    channel: InMemoryChannel,
}

impl BrokerServer {
    pub async fn bind(addr: &str) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ChannelError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            channel: InMemoryChannel::new(),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr().ok()
    }

    /// The in-process side of the broker
    pub fn channel(&self) -> InMemoryChannel {
        self.channel.clone()
    }

    /// Accept connections until the task is aborted
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        tracing::info!(addr = ?self.local_addr(), "broker listening");
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let channel = self.channel.clone();
                    tokio::spawn(async move {
                        match handle_connection(stream, channel).await {
                            Ok(()) => tracing::debug!(%peer, "broker client disconnected"),
                            Err(e) => tracing::warn!(%peer, error = %e, "broker connection failed"),
                        }
                    });
                }
                Err(e) => tracing::error!(error = %e, "accept failed"),
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, channel: InMemoryChannel) -> Result<(), ProtocolError> {
    let (mut reader, writer) = stream.into_split();
    let mut writer = Some(writer);
    let mut forwarder: Option<JoinHandle<()>> = None;

    let result = loop {
        let frame = match protocol::read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(ProtocolError::ConnectionClosed) => break Ok(()),
            Err(e) => break Err(e),
        };

        match frame {
            Frame::Subscribe { client_id } => {
                let Some(mut writer) = writer.take() else {
                    tracing::warn!(client_id, "second subscribe on one connection ignored");
                    continue;
                };
                let mut rx = channel.register(&client_id);
                tracing::info!(client_id, "broker client subscribed");
                forwarder = Some(tokio::spawn(async move {
                    while let Some(entries) = rx.recv().await {
                        if let Err(e) = protocol::write_frame(&mut writer, &Frame::Deliver { entries }).await {
                            tracing::debug!(client_id, error = %e, "delivery to client failed");
                            break;
                        }
                    }
                }));
            }
            Frame::Publish { entries } => {
                let count = entries.len();
                let subscribers = channel.broadcast(entries);
                tracing::debug!(entries = count, subscribers, "relayed batch");
            }
            Frame::Deliver { .. } => {
                tracing::warn!("ignoring deliver frame sent by a client");
            }
        }
    };

    if let Some(forwarder) = forwarder {
        forwarder.abort();
    }
    result
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
