//! Request body framing on top of a [`BufferedClient`].
//!
//! The framing is chosen once the request head is parsed, purely from what the
//! parser recorded:
//!
//! - `chunked`: the last transfer coding is `chunked`
//! - until close: `Connection: close`, no content length and no chunking
//! - plain: exactly `Content-Length` bytes (possibly none)
//!
//! Bytes read past the end of the body are pushed back to the client, so the
//! next request on the connection starts exactly where this body ended.

use std::io;
use std::task::Poll;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::trace;

use crate::codec::{ChunkedDecoder, CodecCache};
use crate::connection::BufferedClient;
use crate::ensure;
use crate::protocol::{BodyError, PayloadItem, Request};
use crate::utils::eq_ignore_case;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Plain { remaining: u64 },
    Chunked,
    UntilClose,
    Done,
    /// An earlier read failed; the stream can no longer be framed.
    Failed,
}

#[derive(Debug)]
pub struct BodyReader {
    mode: Mode,
    decoder: ChunkedDecoder,
    max_size: u64,
    received: u64,
    decoded: u64,
    /// Transfer codings still to be undone, outermost first.
    codings: Vec<String>,
}

impl BodyReader {
    pub fn new(max_size: u64) -> Self {
        Self { mode: Mode::Done, decoder: ChunkedDecoder::new(), max_size, received: 0, decoded: 0, codings: Vec::new() }
    }

    /// Selects the framing of `request`'s body and checks its codings are supported.
    pub fn init(&mut self, request: &Request, codecs: &mut CodecCache) -> Result<(), BodyError> {
        self.decoder.reset();
        self.received = 0;
        self.decoded = 0;
        self.codings.clear();

        let encoding = request.encoding();
        self.mode = if encoding.chunked {
            Mode::Chunked
        } else if request.content_length() == 0 && eq_ignore_case(request.connection(), "close") {
            Mode::UntilClose
        } else if request.content_length() == 0 {
            Mode::Done
        } else {
            ensure!(request.content_length() <= self.max_size, BodyError::body_too_large(self.max_size));
            Mode::Plain { remaining: request.content_length() }
        };

        if encoding.chunked {
            let applied = &encoding.transfer[..encoding.transfer.len() - 1];
            for token in applied.iter().rev().filter(|token| *token != "identity") {
                ensure!(!self.codings.contains(token), BodyError::not_implemented(token));
                let decompressor = codecs.decompressor(token).ok_or_else(|| BodyError::not_implemented(token))?;
                decompressor.reset();
                self.codings.push(token.clone());
            }
        }

        trace!(mode = ?self.mode, codings = ?self.codings, "request body framing selected");
        Ok(())
    }

    /// Whether the whole body has been read off the wire.
    pub fn is_done(&self) -> bool {
        self.mode == Mode::Done && self.codings.is_empty()
    }

    /// Whether a read failed. Nothing more can be read from the connection then.
    pub fn has_failed(&self) -> bool {
        self.mode == Mode::Failed
    }

    /// Next piece of the decoded body, or [`PayloadItem::Eof`] once it is exhausted.
    ///
    /// The first error is latched: every later read or discard fails too.
    pub async fn read<R, W>(
        &mut self,
        client: &mut BufferedClient<R, W>,
        codecs: &mut CodecCache,
    ) -> Result<PayloadItem, BodyError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let item = self.read_decoded(client, codecs).await;
        if item.is_err() {
            self.mode = Mode::Failed;
        }
        item
    }

    async fn read_decoded<R, W>(
        &mut self,
        client: &mut BufferedClient<R, W>,
        codecs: &mut CodecCache,
    ) -> Result<PayloadItem, BodyError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            match self.read_raw(client).await? {
                PayloadItem::Chunk(raw) if self.codings.is_empty() => return Ok(PayloadItem::Chunk(raw)),
                PayloadItem::Chunk(raw) => {
                    let plain = self.decompress(codecs, raw)?;
                    if !plain.is_empty() {
                        return Ok(PayloadItem::Chunk(plain));
                    }
                }
                PayloadItem::Eof if self.codings.is_empty() => return Ok(PayloadItem::Eof),
                PayloadItem::Eof => {
                    let tail = self.finish(codecs)?;
                    if !tail.is_empty() {
                        return Ok(PayloadItem::Chunk(tail));
                    }
                }
            }
        }
    }

    /// Reads and drops whatever is left of the body, leaving the client at the
    /// start of the next request.
    pub async fn discard<R, W>(&mut self, client: &mut BufferedClient<R, W>) -> Result<(), BodyError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while self.mode != Mode::Done {
            if let Err(e) = self.read_raw(client).await {
                self.mode = Mode::Failed;
                return Err(e);
            }
        }
        self.codings.clear();
        Ok(())
    }

    async fn read_raw<R, W>(&mut self, client: &mut BufferedClient<R, W>) -> Result<PayloadItem, BodyError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        match self.mode {
            Mode::Done => Ok(PayloadItem::Eof),

            Mode::Failed => Err(BodyError::io(io::Error::other("request body already failed"))),

            Mode::Plain { remaining } => {
                let mut bytes = read_some(client).await?;
                let len = bytes.len() as u64;
                if len >= remaining {
                    let rest = bytes.split_off(remaining as usize);
                    client.pushback(rest);
                    self.mode = Mode::Done;
                } else {
                    self.mode = Mode::Plain { remaining: remaining - len };
                }
                self.count(bytes.len())?;
                Ok(PayloadItem::Chunk(bytes))
            }

            Mode::Chunked => loop {
                let mut bytes = read_some(client).await?;
                match self.decoder.parse(&mut bytes) {
                    Poll::Pending => {}
                    Poll::Ready(Ok(PayloadItem::Chunk(data))) => {
                        client.pushback(bytes);
                        self.count(data.len())?;
                        return Ok(PayloadItem::Chunk(data));
                    }
                    Poll::Ready(Ok(PayloadItem::Eof)) => {
                        client.pushback(bytes);
                        self.mode = Mode::Done;
                        return Ok(PayloadItem::Eof);
                    }
                    Poll::Ready(Err(e)) => return Err(e),
                }
            },

            Mode::UntilClose => {
                let bytes = client.read().await?;
                if bytes.is_empty() {
                    self.mode = Mode::Done;
                    return Ok(PayloadItem::Eof);
                }
                self.count(bytes.len())?;
                Ok(PayloadItem::Chunk(bytes))
            }
        }
    }

    fn count(&mut self, n: usize) -> Result<(), BodyError> {
        trace!(bytes = n, received = self.received, "request body read");
        self.received = self
            .received
            .checked_add(n as u64)
            .filter(|&total| total <= self.max_size)
            .ok_or_else(|| BodyError::body_too_large(self.max_size))?;
        Ok(())
    }

    fn count_decoded(&mut self, n: usize) -> Result<(), BodyError> {
        self.decoded = self
            .decoded
            .checked_add(n as u64)
            .filter(|&total| total <= self.max_size)
            .ok_or_else(|| BodyError::body_too_large(self.max_size))?;
        Ok(())
    }

    fn decompress(&mut self, codecs: &mut CodecCache, mut data: Bytes) -> Result<Bytes, BodyError> {
        for token in &self.codings {
            if data.is_empty() {
                break;
            }
            let decompressor = codecs.decompressor(token).ok_or_else(|| BodyError::not_implemented(token))?;
            data = decompressor.write(&data).map_err(BodyError::decompress)?;
        }
        self.count_decoded(data.len())?;
        Ok(data)
    }

    /// Terminates every decompressor, feeding each one's tail into the next.
    fn finish(&mut self, codecs: &mut CodecCache) -> Result<Bytes, BodyError> {
        let mut data = Bytes::new();
        for token in &self.codings {
            let decompressor = codecs.decompressor(token).ok_or_else(|| BodyError::not_implemented(token))?;
            let mut out = BytesMut::new();
            if !data.is_empty() {
                out.extend_from_slice(&decompressor.write(&data).map_err(BodyError::decompress)?);
            }
            out.extend_from_slice(&decompressor.finish().map_err(BodyError::decompress)?);
            data = out.freeze();
        }
        self.codings.clear();
        self.count_decoded(data.len())?;
        Ok(data)
    }
}

/// Reads the next bytes of a body that is not allowed to end yet.
async fn read_some<R, W>(client: &mut BufferedClient<R, W>) -> Result<Bytes, BodyError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let bytes = client.read().await?;
    ensure!(!bytes.is_empty(), BodyError::io(io::Error::new(io::ErrorKind::UnexpectedEof, "body is truncated")));
    Ok(bytes)
}

/// The request body as seen by a router.
///
/// Reading is optional: whatever the router leaves unread is discarded by the
/// connection before the next request.
pub struct RequestBody<'a, R, W> {
    reader: &'a mut BodyReader,
    client: &'a mut BufferedClient<R, W>,
    codecs: &'a mut CodecCache,
    hijacked: bool,
}

impl<'a, R, W> RequestBody<'a, R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: &'a mut BodyReader, client: &'a mut BufferedClient<R, W>, codecs: &'a mut CodecCache) -> Self {
        Self { reader, client, codecs, hijacked: false }
    }

    /// Next piece of the body, `None` at its end.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        let item = self.reader.read(self.client, self.codecs).await?;
        Ok(item.into_bytes())
    }

    /// Collects the remaining body into one buffer.
    pub async fn bytes(&mut self) -> Result<Bytes, BodyError> {
        let mut body = BytesMut::new();
        while let Some(chunk) = self.chunk().await? {
            if body.is_empty() && self.reader.is_done() {
                return Ok(chunk);
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }

    pub fn is_done(&self) -> bool {
        self.reader.is_done()
    }

    /// Takes the connection over: once the router returns, the connection stops
    /// serving HTTP and hands the socket back to the embedding application.
    pub fn hijack(&mut self) {
        self.hijacked = true;
    }

    pub fn is_hijacked(&self) -> bool {
        self.hijacked
    }
}

impl<R, W> std::fmt::Debug for RequestBody<'_, R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBody").field("reader", &self.reader).field("hijacked", &self.hijacked).finish()
    }
}
