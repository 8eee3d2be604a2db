//! Chunked transfer encoding on the response side.
//!
//! [`write_chunk`] frames data into a bounded output buffer the serializer
//! owns. When the buffer already holds unflushed bytes (typically the response
//! headers), the size field is padded to the width the free space could need,
//! using a zero extension (`;000`). The payload therefore starts at the same
//! offset whatever its final length, and the framing stays valid: receivers
//! ignore unknown chunk extensions.

use crate::protocol::{PayloadItem, SendError};
use crate::utils::hex_len;
use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

/// Smallest chunk worth writing: one hex digit, CRLF, one byte, CRLF.
pub const MIN_CHUNK_SIZE: usize = 6;

/// Terminal zero-length chunk with an empty trailer section.
pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

const CRLF_LEN: usize = 2;
const HEX: &[u8; 16] = b"0123456789ABCDEF";
const ZERO_FILL: &[u8; 16] = b";000000000000000";

/// Frames a prefix of `data` as one chunk into `dst`, using at most `free` bytes.
///
/// Returns how many bytes of `data` were framed; `0` when `free` cannot hold
/// a minimal chunk and the caller must flush first.
pub fn write_chunk(dst: &mut BytesMut, free: usize, data: &[u8]) -> usize {
    if free < MIN_CHUNK_SIZE || data.is_empty() {
        return 0;
    }

    let width = hex_len(free - 2 * CRLF_LEN);
    let n = data.len().min(free - width - 2 * CRLF_LEN);
    let digits = hex_len(n);

    dst.reserve(width + n + 2 * CRLF_LEN);

    if !dst.is_empty() && width > digits {
        match width - digits {
            // a bare `;` is not a valid extension, a leading zero is
            1 => {
                dst.put_u8(b'0');
                put_hex(dst, n);
            }
            pad => {
                put_hex(dst, n);
                dst.put_slice(&ZERO_FILL[..pad]);
            }
        }
    } else {
        put_hex(dst, n);
    }

    dst.put_slice(b"\r\n");
    dst.put_slice(&data[..n]);
    dst.put_slice(b"\r\n");
    n
}

fn put_hex(dst: &mut BytesMut, n: usize) {
    for i in (0..hex_len(n)).rev() {
        dst.put_u8(HEX[(n >> (i * 4)) & 0xf]);
    }
}

/// Unbounded chunked framing for a growable destination, one chunk per item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false }
    }
}

impl Encoder<PayloadItem> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(bytes) if bytes.is_empty() => Ok(()),
            PayloadItem::Chunk(bytes) => {
                dst.reserve(hex_len(bytes.len()) + bytes.len() + 2 * CRLF_LEN);
                put_hex(dst, bytes.len());
                dst.put_slice(b"\r\n");
                dst.put_slice(&bytes);
                dst.put_slice(b"\r\n");
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                dst.put_slice(LAST_CHUNK);
                Ok(())
            }
        }
    }
}
