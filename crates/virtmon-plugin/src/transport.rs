// SPDX-FileCopyrightText: 2026 Virtmon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Framed message transport for plugin connections.
//!
//! Each frame is a 4-byte big-endian length prefix followed by one JSON
//! document. A connection is usually a child process's stdio pair, or an
//! in-memory duplex pipe in tests.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use virtmon_core::VirtmonError;

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A bidirectional stream of length-delimited JSON frames.
pub struct Connection {
    reader: FramedRead<BoxReader, LengthDelimitedCodec>,
    writer: FramedWrite<BoxWriter, LengthDelimitedCodec>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("max_frame_bytes", &self.reader.decoder().max_frame_length())
            .finish()
    }
}

impl Connection {
    /// Wrap a single duplex I/O object.
    pub fn new<T>(io: T, max_frame_bytes: usize) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(io);
        Self::from_parts(reader, writer, max_frame_bytes)
    }

    /// Wrap separate read and write halves, e.g. a child's stdout and stdin.
    pub fn from_parts<R, W>(reader: R, writer: W, max_frame_bytes: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let codec = || {
            LengthDelimitedCodec::builder()
                .max_frame_length(max_frame_bytes)
                .new_codec()
        };
        Self {
            reader: FramedRead::new(Box::new(reader) as BoxReader, codec()),
            writer: FramedWrite::new(Box::new(writer) as BoxWriter, codec()),
        }
    }

    /// Serialize a message into a frame body without sending it.
    pub fn encode<M: Serialize>(message: &M) -> Result<Bytes, VirtmonError> {
        serde_json::to_vec(message)
            .map(Bytes::from)
            .map_err(|e| VirtmonError::Schema(format!("failed to encode frame: {e}")))
    }

    /// Serialize and send one message.
    pub async fn send<M: Serialize>(&mut self, message: &M) -> Result<(), VirtmonError> {
        let frame = Self::encode(message)?;
        self.send_frame(frame).await
    }

    /// Send a frame body produced by [`Connection::encode`].
    pub async fn send_frame(&mut self, frame: Bytes) -> Result<(), VirtmonError> {
        self.writer
            .send(frame)
            .await
            .map_err(|e| VirtmonError::transport("failed to write frame", e))
    }

    /// Receive and decode the next message.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly between
    /// frames.
    pub async fn recv<M: DeserializeOwned>(&mut self) -> Result<Option<M>, VirtmonError> {
        match self.reader.next().await {
            None => Ok(None),
            Some(Err(e)) => Err(VirtmonError::transport("failed to read frame", e)),
            Some(Ok(frame)) => serde_json::from_slice(&frame)
                .map(Some)
                .map_err(|e| VirtmonError::Schema(format!("failed to decode frame: {e}"))),
        }
    }

    /// Flush and close the write half so the peer observes end of stream.
    pub async fn close(&mut self) -> Result<(), VirtmonError> {
        SinkExt::<Bytes>::close(&mut self.writer)
            .await
            .map_err(|e| VirtmonError::transport("failed to close connection", e))
    }
}
