//! Length-prefixed message framing
//!
//! Both channels carry the same framing: a 4-byte big-endian length followed
//! by exactly that many payload bytes. The video channel carries encoded
//! images, the input channel carries JSON commands.

use bytes::{BufMut, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{trace, warn};

use crate::error::{ProtocolError, Result, TransportError};

/// Length prefix size (4 bytes for u32)
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest accepted video frame (32 MB)
pub const MAX_FRAME_SIZE: usize = 32 * 1024 * 1024;

/// Largest accepted input command (64 KB)
pub const MAX_COMMAND_SIZE: usize = 64 * 1024;

/// Writes one length-prefixed message
///
/// Prefix and payload go out in a single buffer so a concurrent reader never
/// observes a prefix without its payload from a successful write.
///
/// # Errors
///
/// Returns `MessageTooLarge` if the payload does not fit in a u32 prefix,
/// or a transport error if the write fails
pub async fn write_message<W>(writer: &mut W, payload: &[u8]) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let size = payload.len();
    let prefix = u32::try_from(size).map_err(|_| ProtocolError::MessageTooLarge {
        size,
        max: u32::MAX as usize,
    })?;

    let mut buffer = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + size);
    buffer.put_u32(prefix);
    buffer.put_slice(payload);

    writer.write_all(&buffer).await.map_err(transport_error)?;
    writer.flush().await.map_err(transport_error)?;

    trace!("Sent message: {} bytes", size);
    Ok(buffer.len())
}

/// Reads one length-prefixed message of at most `max` bytes
///
/// An oversized payload is read and discarded so the stream stays aligned on
/// the next prefix, and reported as a protocol error.
///
/// # Errors
///
/// Returns `TransportError::Closed` if the stream ends before a full message
/// arrives, or `MessageTooLarge` for an oversized payload
pub async fn read_message<R>(reader: &mut R, max: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; LENGTH_PREFIX_SIZE];
    reader
        .read_exact(&mut len_bytes)
        .await
        .map_err(transport_error)?;
    let len = u32::from_be_bytes(len_bytes) as usize;

    if len > max {
        warn!("Discarding oversized message: {} bytes (max {})", len, max);
        let skipped = tokio::io::copy(&mut (&mut *reader).take(len as u64), &mut tokio::io::sink())
            .await
            .map_err(transport_error)?;
        if skipped < len as u64 {
            return Err(TransportError::Closed.into());
        }
        return Err(ProtocolError::MessageTooLarge { size: len, max }.into());
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(transport_error)?;

    trace!("Received message: {} bytes", len);
    Ok(payload)
}

/// Maps socket errors, a short read means the peer went away
fn transport_error(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => TransportError::Closed,
        _ => TransportError::Io(err),
    }
}

/// Writer half of a channel that counts what it sends
pub struct MessageWriter<W> {
    inner: W,
    messages_sent: u64,
    bytes_sent: u64,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    /// Wraps a writer
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            messages_sent: 0,
            bytes_sent: 0,
        }
    }

    /// Sends one message
    ///
    /// # Errors
    ///
    /// See [`write_message`]
    pub async fn send(&mut self, payload: &[u8]) -> Result<usize> {
        let written = write_message(&mut self.inner, payload).await?;
        self.messages_sent += 1;
        self.bytes_sent += written as u64;
        Ok(written)
    }

    /// Messages sent so far
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    /// Bytes sent so far, prefixes included
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Shuts the underlying writer down
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.inner.shutdown().await {
            trace!("Shutdown after close: {}", e);
        }
    }
}

/// Reader half of a channel with a fixed size limit
pub struct MessageReader<R> {
    inner: R,
    max: usize,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    /// Wraps a reader accepting messages of at most `max` bytes
    pub fn new(inner: R, max: usize) -> Self {
        Self { inner, max }
    }

    /// Receives one message
    ///
    /// # Errors
    ///
    /// See [`read_message`]
    pub async fn recv(&mut self) -> Result<Vec<u8>> {
        read_message(&mut self.inner, self.max).await
    }
}
