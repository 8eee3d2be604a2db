//! Decoder implementation for HTTP chunked transfer encoding.
//!
//! This module decodes bodies framed as described in
//! [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).
//! The decoder is a resumable state machine: input may be split anywhere,
//! including inside the size digits, an extension, the chunk data or a trailer
//! line, and decoding continues where the previous fragment stopped.
//!
//! Both `\r\n` and a bare `\n` are accepted as line terminators.

use crate::protocol::{BodyError, PayloadItem};
use bytes::{Buf, Bytes, BytesMut};
use std::task::Poll;
use tokio_util::codec::Decoder;
use tracing::trace;
use ChunkedState::*;

/// At most 8 hex digits per chunk size, capping a single chunk at 4 GiB.
const MAX_SIZE_DIGITS: u8 = 8;

/// A decoder for handling HTTP chunked transfer encoding.
///
/// After signaling the end of a body it resets itself, so one instance serves
/// every chunked body on a keep-alive connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    digits: u8,
    remaining_size: u64,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size in hex
    Size,
    /// Whitespace after the size, no more digits allowed
    SizeLws,
    /// Skip a chunk extension up to the end of line
    Extension,
    /// Read LF after CR of the size line
    SizeLf,
    /// Read chunk data
    Body,
    /// Read CR (or bare LF) after chunk data
    BodyCr,
    /// Read LF after chunk data
    BodyLf,
    /// Start of a line after the last chunk: trailer field or final empty line
    Trailer,
    /// Skip a trailer field line
    TrailerField,
    /// Read final LF
    EndLf,
}

/// Byte sources the decoder can split chunk data off without copying.
trait Source: Buf {
    fn take_bytes(&mut self, n: usize) -> Bytes;
}

impl Source for Bytes {
    fn take_bytes(&mut self, n: usize) -> Bytes {
        self.split_to(n)
    }
}

impl Source for BytesMut {
    fn take_bytes(&mut self, n: usize) -> Bytes {
        self.split_to(n).freeze()
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.has_remaining() {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: Size, digits: 0, remaining_size: 0 }
    }

    /// Feeds the next fragment of a chunked body.
    ///
    /// # Returns
    /// - `Poll::Pending` when `src` was consumed entirely and more input is needed
    /// - `Poll::Ready(Ok(PayloadItem::Chunk(bytes)))` with a piece of data; `src`
    ///   keeps the bytes after that piece and must be fed again
    /// - `Poll::Ready(Ok(PayloadItem::Eof))` at the end of the body; `src` keeps
    ///   whatever follows the body, usually the next pipelined request
    /// - `Poll::Ready(Err(BodyError::BadChunk))` on malformed framing
    pub fn parse(&mut self, src: &mut Bytes) -> Poll<Result<PayloadItem, BodyError>> {
        self.decode_from(src)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn decode_from<S: Source>(&mut self, src: &mut S) -> Poll<Result<PayloadItem, BodyError>> {
        loop {
            if !src.has_remaining() {
                return Poll::Pending;
            }

            let mut buf = None;

            match self.step(src, &mut buf) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(Some(new_state))) => self.state = new_state,
                Poll::Ready(Ok(None)) => {
                    trace!("finished reading chunked data");
                    self.reset();
                    return Poll::Ready(Ok(PayloadItem::Eof));
                }
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
            }

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Poll::Ready(Ok(PayloadItem::Chunk(bytes)));
            }
        }
    }

    /// Runs one transition. `Ok(None)` means the body just ended.
    fn step<S: Source>(&mut self, src: &mut S, buf: &mut Option<Bytes>) -> Poll<Result<Option<ChunkedState>, BodyError>> {
        let next = match self.state {
            Size => self.read_size(src),
            SizeLws => self.read_size_lws(src),
            Extension => read_extension(src),
            SizeLf => self.read_size_lf(src),
            Body => self.read_body(src, buf),
            BodyCr => read_body_cr(src),
            BodyLf => read_body_lf(src),
            Trailer => return read_trailer(src),
            TrailerField => read_trailer_field(src),
            EndLf => return read_end_lf(src),
        };

        next.map(|result| result.map(Some))
    }

    fn read_size<S: Source>(&mut self, src: &mut S) -> Poll<Result<ChunkedState, BodyError>> {
        let b = try_next_byte!(src);

        if let Some(digit) = crate::utils::unhex(b) {
            if self.digits == MAX_SIZE_DIGITS {
                return Poll::Ready(Err(BodyError::bad_chunk("chunk size has too many digits")));
            }
            self.digits += 1;
            self.remaining_size = (self.remaining_size << 4) | u64::from(digit);
            return Poll::Ready(Ok(Size));
        }

        if self.digits == 0 {
            return Poll::Ready(Err(BodyError::bad_chunk("invalid chunk size")));
        }

        match b {
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => Poll::Ready(Ok(self.size_line_done())),
            _ => Poll::Ready(Err(BodyError::bad_chunk("invalid chunk size"))),
        }
    }

    fn read_size_lws<S: Source>(&mut self, src: &mut S) -> Poll<Result<ChunkedState, BodyError>> {
        match try_next_byte!(src) {
            // LWS can follow the chunk size, but no more digits can come
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => Poll::Ready(Ok(self.size_line_done())),
            _ => Poll::Ready(Err(BodyError::bad_chunk("invalid chunk size linear white space"))),
        }
    }

    fn read_size_lf<S: Source>(&mut self, src: &mut S) -> Poll<Result<ChunkedState, BodyError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(self.size_line_done())),
            _ => Poll::Ready(Err(BodyError::bad_chunk("invalid chunk size LF"))),
        }
    }

    fn size_line_done(&mut self) -> ChunkedState {
        self.digits = 0;
        if self.remaining_size == 0 { Trailer } else { Body }
    }

    fn read_body<S: Source>(&mut self, src: &mut S, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, BodyError>> {
        // cap remaining bytes at the max capacity of usize
        let remaining = usize::try_from(self.remaining_size).unwrap_or(usize::MAX);
        let read_size = remaining.min(src.remaining());

        self.remaining_size -= read_size as u64;
        *buf = Some(src.take_bytes(read_size));

        if self.remaining_size > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
    }
}

/// Extensions are ignored verbatim up to the end of the line.
fn read_extension<S: Source>(src: &mut S) -> Poll<Result<ChunkedState, BodyError>> {
    match src.chunk().iter().position(|&b| b == b'\n') {
        Some(lf) => {
            // leave the LF in place, SizeLf consumes it
            src.advance(lf);
            Poll::Ready(Ok(SizeLf))
        }
        None => {
            src.advance(src.remaining());
            Poll::Pending
        }
    }
}

fn read_body_cr<S: Source>(src: &mut S) -> Poll<Result<ChunkedState, BodyError>> {
    match try_next_byte!(src) {
        b'\r' => Poll::Ready(Ok(BodyLf)),
        b'\n' => Poll::Ready(Ok(Size)),
        _ => Poll::Ready(Err(BodyError::bad_chunk("invalid chunk body CR"))),
    }
}

fn read_body_lf<S: Source>(src: &mut S) -> Poll<Result<ChunkedState, BodyError>> {
    match try_next_byte!(src) {
        b'\n' => Poll::Ready(Ok(Size)),
        _ => Poll::Ready(Err(BodyError::bad_chunk("invalid chunk body LF"))),
    }
}

fn read_trailer<S: Source>(src: &mut S) -> Poll<Result<Option<ChunkedState>, BodyError>> {
    match try_next_byte!(src) {
        b'\r' => Poll::Ready(Ok(Some(EndLf))),
        b'\n' => Poll::Ready(Ok(None)),
        _ => Poll::Ready(Ok(Some(TrailerField))),
    }
}

fn read_trailer_field<S: Source>(src: &mut S) -> Poll<Result<ChunkedState, BodyError>> {
    match src.chunk().iter().position(|&b| b == b'\n') {
        Some(lf) => {
            src.advance(lf + 1);
            Poll::Ready(Ok(Trailer))
        }
        None => {
            src.advance(src.remaining());
            Poll::Pending
        }
    }
}

fn read_end_lf<S: Source>(src: &mut S) -> Poll<Result<Option<ChunkedState>, BodyError>> {
    match try_next_byte!(src) {
        b'\n' => Poll::Ready(Ok(None)),
        _ => Poll::Ready(Err(BodyError::bad_chunk("invalid chunk end LF"))),
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = BodyError;

    /// Decodes chunked data from a framed read buffer.
    ///
    /// # Returns
    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` when a piece of chunk data is decoded
    /// - `Ok(Some(PayloadItem::Eof))` when the final chunk and trailers are consumed
    /// - `Ok(None)` when more data is needed
    /// - `Err(BodyError)` if the chunked encoding is invalid
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode_from(src) {
            Poll::Pending => Ok(None),
            Poll::Ready(item) => item.map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds `input` in fragments of `step` bytes and collects the decoded body and leftover.
    fn decode_in_steps(input: &[u8], step: usize) -> Result<(Vec<u8>, Vec<u8>), BodyError> {
        let mut decoder = ChunkedDecoder::new();
        let mut body = Vec::new();

        for (i, fragment) in input.chunks(step).enumerate() {
            let mut src = Bytes::copy_from_slice(fragment);
            loop {
                match decoder.parse(&mut src) {
                    Poll::Pending => break,
                    Poll::Ready(Ok(PayloadItem::Chunk(bytes))) => body.extend_from_slice(&bytes),
                    Poll::Ready(Ok(PayloadItem::Eof)) => {
                        let mut leftover = src.to_vec();
                        leftover.extend_from_slice(&input[((i + 1) * step).min(input.len())..]);
                        return Ok((body, leftover));
                    }
                    Poll::Ready(Err(e)) => return Err(e),
                }
            }
        }

        Err(BodyError::bad_chunk("unexpected end of input"))
    }

    #[test]
    fn test_basic() {
        let mut buffer: BytesMut = BytesMut::from(&b"10\r\n1234567890abcdef\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(item.is_chunk());
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"1234567890abcdef");

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(item.is_eof());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_mozilla_example() {
        let input = b"7\r\nMozilla\r\n9\r\nDeveloper\r\n7\r\nNetwork\r\n0\r\n\r\n";
        let (body, leftover) = decode_in_steps(input, input.len()).unwrap();
        assert_eq!(body, b"MozillaDeveloperNetwork");
        assert!(leftover.is_empty());
    }

    #[test]
    fn test_every_split_point() {
        let input = b"7\r\nMozilla\r\n9;name=value\r\nDeveloper\r\n7\nNetwork\n0\r\nExpires: never\r\n\r\nGET / HTTP/1.1\r\n\r\n";
        for step in 1..input.len() {
            let (body, leftover) = decode_in_steps(input, step).unwrap();
            assert_eq!(body, b"MozillaDeveloperNetwork", "step {step}");
            assert_eq!(leftover, b"GET / HTTP/1.1\r\n\r\n", "step {step}");
        }
    }

    #[test]
    fn test_leftover_after_eof() {
        let mut src = Bytes::from_static(b"5\r\nhello\r\n0\r\n\r\nnext");
        let mut decoder = ChunkedDecoder::new();

        assert!(matches!(decoder.parse(&mut src), Poll::Ready(Ok(PayloadItem::Chunk(ref b))) if b == "hello"));
        assert!(matches!(decoder.parse(&mut src), Poll::Ready(Ok(PayloadItem::Eof))));
        assert_eq!(src, Bytes::from_static(b"next"));
        assert_eq!(decoder, ChunkedDecoder::new());
    }

    #[test]
    fn test_restart_after_eof() {
        let mut decoder = ChunkedDecoder::new();
        for _ in 0..2 {
            let mut src = Bytes::from_static(b"3\r\nabc\r\n0\r\n\r\n");
            assert!(matches!(decoder.parse(&mut src), Poll::Ready(Ok(PayloadItem::Chunk(_)))));
            assert!(matches!(decoder.parse(&mut src), Poll::Ready(Ok(PayloadItem::Eof))));
        }
    }

    #[test]
    fn test_chunks_with_trailers() {
        let mut buffer: BytesMut = BytesMut::from(&b"5\r\nhello\r\n0\r\nTrailer: value\r\nAnother: one\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::copy_from_slice(b"hello"));

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
    }

    #[test]
    fn test_incomplete_chunk() {
        let mut buffer: BytesMut = BytesMut::from(&b"5\r\nhel"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap();
        assert_eq!(chunk.unwrap().as_bytes().unwrap(), &Bytes::copy_from_slice(b"hel"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"lo\r\n0\r\n\r\n");

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::copy_from_slice(b"lo"));

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
    }

    #[test]
    fn test_invalid_chunk_size() {
        let mut buffer: BytesMut = BytesMut::from(&b"xyz\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert!(matches!(decoder.decode(&mut buffer), Err(BodyError::BadChunk { .. })));

        let mut buffer: BytesMut = BytesMut::from(&b"\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert!(matches!(decoder.decode(&mut buffer), Err(BodyError::BadChunk { .. })));
    }

    #[test]
    fn test_too_many_size_digits() {
        let mut decoder = ChunkedDecoder::new();
        let mut ok = Bytes::from_static(b"ffffffff\r\n");
        assert!(decoder.parse(&mut ok).is_pending());

        let mut decoder = ChunkedDecoder::new();
        let mut overflow = Bytes::from_static(b"100000000\r\n");
        assert!(matches!(decoder.parse(&mut overflow), Poll::Ready(Err(BodyError::BadChunk { .. }))));
    }

    #[test]
    fn test_missing_crlf() {
        let mut buffer: BytesMut = BytesMut::from(&b"5\r\nhelloBad"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::copy_from_slice(b"hello"));

        assert!(decoder.decode(&mut buffer).is_err());
    }

    #[test]
    fn test_bare_lf_after_size_whitespace() {
        let input = b"5 \nhello\n3\t \nabc\n0 \n\nrest";
        for step in 1..=input.len() {
            let (body, leftover) = decode_in_steps(input, step).unwrap();
            assert_eq!(body, b"helloabc");
            assert_eq!(leftover, b"rest");
        }
    }

    #[test]
    fn test_large_chunk() {
        let size = 1024 * 1024;
        let mut data = Vec::with_capacity(size + 16);
        data.extend(format!("{size:x}\r\n").into_bytes());
        data.extend(vec![b'A'; size]);
        data.extend(b"\r\n0\r\n\r\n");

        let mut buffer = BytesMut::from(&data[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap().len(), size);
        assert!(chunk.as_bytes().unwrap().iter().all(|&b| b == b'A'));

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
    }

    #[test]
    fn test_zero_size_chunk() {
        let mut buffer: BytesMut = BytesMut::from(&b"0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let eof = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(eof.is_eof());
    }
}
