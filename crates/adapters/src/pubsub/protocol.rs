// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker wire protocol
//!
//! Each frame is a 4-byte big-endian length followed by that many bytes
//! of JSON.

use ebl_core::EventEntry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame accepted from a peer
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Messages exchanged with the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Client -> broker: deliver every future batch to this connection
    Subscribe { client_id: String },
    /// Client -> broker: broadcast a batch
    Publish { entries: Vec<EventEntry> },
    /// Broker -> client: a broadcast batch
    Deliver { entries: Vec<EventEntry> },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("frame of {0} bytes exceeds limit")]
    FrameTooLarge(usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize a frame to JSON (no length prefix)
pub fn encode(frame: &Frame) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(frame)?)
}

/// Parse a frame from JSON (no length prefix)
pub fn decode(bytes: &[u8]) -> Result<Frame, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read one length-prefixed frame
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Frame, ProtocolError> {
    let mut len = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed,
            _ => ProtocolError::Io(e),
        });
    }

    let len = u32::from_be_bytes(len) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    decode(&body)
}

/// Write one length-prefixed frame
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> Result<(), ProtocolError> {
    let body = encode(frame)?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(body.len()));
    }

    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
