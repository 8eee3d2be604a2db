//! Content codings the engine ships with: `gzip`, `deflate` and `zstd`.
//!
//! A [`Codec`] is a shareable factory registered under one coding token.
//! The streams it creates are per connection and reusable: after
//! [`finish`](Compressor::finish) or [`reset`](Compressor::reset) the next
//! write starts a fresh stream.
//!
//! Both directions use the `io::Write` flavour of the flate2/zstd encoders and
//! decoders, writing into an in-memory [`Writer`] whose contents are drained
//! after every call.

use bytes::{Bytes, BytesMut};
use flate2::Compression;
use flate2::write::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};
use std::io::{self, Write};
use tracing::trace;

pub const GZIP: &str = "gzip";
pub const DEFLATE: &str = "deflate";
pub const ZSTD: &str = "zstd";

const ZSTD_LEVEL: i32 = 3;

/// Factory for the compressor and decompressor of one coding token.
pub trait Codec: Send + Sync {
    /// Lowercase token as it appears in `Content-Encoding` and friends.
    fn token(&self) -> &str;

    fn new_compressor(&self) -> Box<dyn Compressor>;

    fn new_decompressor(&self) -> Box<dyn Decompressor>;
}

/// A streaming compressor.
pub trait Compressor: Send {
    /// Feeds plain bytes, returning any compressed output produced so far.
    fn write(&mut self, data: &[u8]) -> io::Result<Bytes>;

    /// Terminates the stream and returns the remaining output.
    fn finish(&mut self) -> io::Result<Bytes>;

    /// Drops any stream in progress.
    fn reset(&mut self);
}

/// A streaming decompressor.
pub trait Decompressor: Send {
    /// Feeds compressed bytes, returning the plain bytes they decode to.
    fn write(&mut self, data: &[u8]) -> io::Result<Bytes>;

    /// Checks the stream is complete and returns the remaining output.
    fn finish(&mut self) -> io::Result<Bytes>;

    fn reset(&mut self);
}

/// `io::Write` sink collecting codec output.
#[derive(Debug, Default)]
pub(crate) struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }

    fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Gzip,
    Deflate,
    Zstd,
}

impl Kind {
    fn token(self) -> &'static str {
        match self {
            Kind::Gzip => GZIP,
            Kind::Deflate => DEFLATE,
            Kind::Zstd => ZSTD,
        }
    }
}

enum Encoder {
    Gzip(GzEncoder<Writer>),
    Deflate(ZlibEncoder<Writer>),
    Zstd(zstd::stream::write::Encoder<'static, Writer>),
}

impl Encoder {
    fn new(kind: Kind) -> io::Result<Self> {
        let encoder = match kind {
            Kind::Gzip => Self::Gzip(GzEncoder::new(Writer::new(), Compression::default())),
            Kind::Deflate => Self::Deflate(ZlibEncoder::new(Writer::new(), Compression::default())),
            Kind::Zstd => Self::Zstd(zstd::stream::write::Encoder::new(Writer::new(), ZSTD_LEVEL)?),
        };
        Ok(encoder)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<Bytes> {
        match self {
            Self::Gzip(encoder) => {
                encoder.write_all(data)?;
                Ok(encoder.get_mut().take())
            }
            Self::Deflate(encoder) => {
                encoder.write_all(data)?;
                Ok(encoder.get_mut().take())
            }
            Self::Zstd(encoder) => {
                encoder.write_all(data)?;
                Ok(encoder.get_mut().take())
            }
        }
    }

    fn finish(self) -> io::Result<Bytes> {
        let writer = match self {
            Self::Gzip(encoder) => encoder.finish()?,
            Self::Deflate(encoder) => encoder.finish()?,
            Self::Zstd(encoder) => encoder.finish()?,
        };
        Ok(writer.into_bytes())
    }
}

enum Decoder {
    Gzip(GzDecoder<Writer>),
    Deflate(ZlibDecoder<Writer>),
    Zstd(zstd::stream::write::Decoder<'static, Writer>),
}

impl Decoder {
    fn new(kind: Kind) -> io::Result<Self> {
        let decoder = match kind {
            Kind::Gzip => Self::Gzip(GzDecoder::new(Writer::new())),
            Kind::Deflate => Self::Deflate(ZlibDecoder::new(Writer::new())),
            Kind::Zstd => Self::Zstd(zstd::stream::write::Decoder::new(Writer::new())?),
        };
        Ok(decoder)
    }

    // decoders hold back output until flushed
    fn write(&mut self, data: &[u8]) -> io::Result<Bytes> {
        match self {
            Self::Gzip(decoder) => {
                decoder.write_all(data)?;
                decoder.flush()?;
                Ok(decoder.get_mut().take())
            }
            Self::Deflate(decoder) => {
                decoder.write_all(data)?;
                decoder.flush()?;
                Ok(decoder.get_mut().take())
            }
            Self::Zstd(decoder) => {
                decoder.write_all(data)?;
                decoder.flush()?;
                Ok(decoder.get_mut().take())
            }
        }
    }

    fn finish(self) -> io::Result<Bytes> {
        let writer = match self {
            Self::Gzip(decoder) => decoder.finish()?,
            Self::Deflate(decoder) => decoder.finish()?,
            Self::Zstd(mut decoder) => {
                decoder.flush()?;
                decoder.into_inner()
            }
        };
        Ok(writer.into_bytes())
    }
}

/// Compressor driving one of the built-in encoders.
pub struct StreamCompressor {
    kind: Kind,
    inner: Option<Encoder>,
}

impl StreamCompressor {
    fn new(kind: Kind) -> Self {
        Self { kind, inner: None }
    }

    fn encoder(&mut self) -> io::Result<&mut Encoder> {
        if self.inner.is_none() {
            self.inner = Some(Encoder::new(self.kind)?);
        }
        self.inner.as_mut().ok_or_else(|| io::Error::other("encoder is not initialized"))
    }
}

impl std::fmt::Debug for StreamCompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCompressor").field("token", &self.kind.token()).field("active", &self.inner.is_some()).finish()
    }
}

impl Compressor for StreamCompressor {
    fn write(&mut self, data: &[u8]) -> io::Result<Bytes> {
        let token = self.kind.token();
        self.encoder()?.write(data).inspect_err(|e| trace!(token, cause = %e, "compress error"))
    }

    fn finish(&mut self) -> io::Result<Bytes> {
        let encoder = match self.inner.take() {
            Some(encoder) => encoder,
            None => Encoder::new(self.kind)?,
        };
        encoder.finish()
    }

    fn reset(&mut self) {
        self.inner = None;
    }
}

/// Decompressor driving one of the built-in decoders.
pub struct StreamDecompressor {
    kind: Kind,
    inner: Option<Decoder>,
}

impl StreamDecompressor {
    fn new(kind: Kind) -> Self {
        Self { kind, inner: None }
    }

    fn decoder(&mut self) -> io::Result<&mut Decoder> {
        if self.inner.is_none() {
            self.inner = Some(Decoder::new(self.kind)?);
        }
        self.inner.as_mut().ok_or_else(|| io::Error::other("decoder is not initialized"))
    }
}

impl std::fmt::Debug for StreamDecompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecompressor").field("token", &self.kind.token()).field("active", &self.inner.is_some()).finish()
    }
}

impl Decompressor for StreamDecompressor {
    fn write(&mut self, data: &[u8]) -> io::Result<Bytes> {
        let token = self.kind.token();
        self.decoder()?.write(data).inspect_err(|e| trace!(token, cause = %e, "decompress error"))
    }

    fn finish(&mut self) -> io::Result<Bytes> {
        match self.inner.take() {
            Some(decoder) => decoder.finish(),
            None => Ok(Bytes::new()),
        }
    }

    fn reset(&mut self) {
        self.inner = None;
    }
}

macro_rules! builtin_codec {
    ($name:ident, $kind:expr) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Codec for $name {
            fn token(&self) -> &str {
                $kind.token()
            }

            fn new_compressor(&self) -> Box<dyn Compressor> {
                Box::new(StreamCompressor::new($kind))
            }

            fn new_decompressor(&self) -> Box<dyn Decompressor> {
                Box::new(StreamDecompressor::new($kind))
            }
        }
    };
}

builtin_codec!(Gzip, Kind::Gzip);
builtin_codec!(Deflate, Kind::Deflate);
builtin_codec!(Zstd, Kind::Zstd);
