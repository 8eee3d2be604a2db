//! Buffered socket halves with a single-slot pushback.
//!
//! Every consumer on the read side (the request parser, the body reader) may
//! receive more bytes than it needs. It hands the surplus back through
//! [`BufferedClient::pushback`] and the next [`BufferedClient::read`] replays
//! them before touching the socket again.

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::trace;

use crate::config::NetConfig;

#[derive(Debug)]
pub struct BufferedClient<R, W> {
    reader: R,
    writer: W,
    buf: BytesMut,
    read_buffer_size: usize,
    read_timeout: Duration,
    pending: Option<Bytes>,
}

impl<R, W> BufferedClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, config: &NetConfig) -> Self {
        Self {
            reader,
            writer,
            buf: BytesMut::with_capacity(config.read_buffer_size),
            read_buffer_size: config.read_buffer_size,
            read_timeout: config.read_timeout,
            pending: None,
        }
    }

    /// Returns pushed back bytes if any, otherwise the next bytes from the socket.
    ///
    /// An empty result means the peer closed its sending side. The idle
    /// deadline restarts on every call; hitting it yields
    /// [`io::ErrorKind::TimedOut`].
    pub async fn read(&mut self) -> io::Result<Bytes> {
        if let Some(bytes) = self.pending.take() {
            return Ok(bytes);
        }

        self.buf.reserve(self.read_buffer_size);
        match timeout(self.read_timeout, self.reader.read_buf(&mut self.buf)).await {
            Ok(Ok(0)) => Ok(Bytes::new()),
            Ok(Ok(n)) => {
                trace!(read_bytes = n, "read from client");
                Ok(self.buf.split().freeze())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "client read timed out")),
        }
    }

    /// Stores `bytes` for the next [`read`](Self::read).
    ///
    /// Only one pushback may be pending at a time; empty slices are ignored.
    pub fn pushback(&mut self, bytes: Bytes) {
        if bytes.is_empty() {
            return;
        }

        debug_assert!(self.pending.is_none(), "pushback while a pushback is pending");
        self.pending = Some(bytes);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data).await
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }

    /// Gives the socket halves back, along with any bytes not yet consumed.
    pub fn into_parts(self) -> (R, W, Option<Bytes>) {
        (self.reader, self.writer, self.pending)
    }
}
