//! Chunked transfer coding for message bodies.
//!
//! - [`ChunkedDecoder`]: resumable decoder for request bodies, usable directly
//!   on `Bytes` fragments or as a `tokio_util` [`Decoder`](tokio_util::codec::Decoder)
//! - [`ChunkedEncoder`]: `tokio_util` [`Encoder`](tokio_util::codec::Encoder) for
//!   growable destinations
//! - [`write_chunk`]: bounded framing with zero-filled size fields, used by the
//!   response serializer

mod chunked_decoder;
mod chunked_encoder;

pub use chunked_decoder::ChunkedDecoder;
pub use chunked_encoder::ChunkedEncoder;
pub use chunked_encoder::LAST_CHUNK;
pub use chunked_encoder::MIN_CHUNK_SIZE;
pub use chunked_encoder::write_chunk;
