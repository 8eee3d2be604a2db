use bytes::Bytes;

/// One step of a body stream: a piece of data, or the end of the body.
///
/// Produced by [`ChunkedDecoder`](crate::codec::ChunkedDecoder) and by the
/// connection's body reader, consumed by the response side when framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    Chunk(Bytes),
    Eof,
}

/// How a response body is framed on the wire.
///
/// - `Length`: a `Content-Length` header and exactly that many bytes
/// - `Chunked`: `Transfer-Encoding: chunked`, size unknown in advance
/// - `Empty`: `Content-Length: 0`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    Length(u64),
    Chunked,
    Empty,
}

impl PayloadSize {
    /// Classifies a declared size, where `None` means the size is unknown.
    #[inline]
    pub fn from_hint(exact: Option<u64>) -> Self {
        match exact {
            Some(0) => PayloadSize::Empty,
            Some(length) => PayloadSize::Length(length),
            None => PayloadSize::Chunked,
        }
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl PayloadItem {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

impl From<Bytes> for PayloadItem {
    fn from(bytes: Bytes) -> Self {
        Self::Chunk(bytes)
    }
}
