//! Byte-level encoding and decoding of HTTP/1.x messages.
//!
//! Nothing in this module performs I/O; every component is a pure byte-in,
//! byte-out state machine owned by a single connection.
//!
//! - Request side:
//!   - [`RequestParser`]: resumable request-line and header parser
//!   - [`ChunkedDecoder`]: chunked transfer decoding of request bodies
//! - Response side:
//!   - [`ChunkedEncoder`] and [`write_chunk`]: chunked framing
//! - Content codings:
//!   - [`Codec`], [`Compressor`], [`Decompressor`]: the integration contract
//!   - [`Gzip`], [`Deflate`], [`Zstd`]: built-in codecs
//!   - [`CodecCache`]: lazily created, per-connection codec instances

mod body;
mod cache;
mod compress;
mod request_parser;

pub use body::ChunkedDecoder;
pub use body::ChunkedEncoder;
pub use body::LAST_CHUNK;
pub use body::MIN_CHUNK_SIZE;
pub use body::write_chunk;
pub use cache::CodecCache;
pub use compress::{Codec, Compressor, DEFLATE, Decompressor, Deflate, GZIP, Gzip, StreamCompressor, StreamDecompressor, ZSTD, Zstd};
pub use request_parser::Parsed;
pub use request_parser::RequestParser;
