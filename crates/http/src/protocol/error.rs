use http::StatusCode;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("body error: {source}")]
    BodyError {
        #[from]
        source: BodyError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("connection timed out")]
    Timeout,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl HttpError {
    /// Status the connection answers with before it closes on this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RequestError { source } => source.status_code(),
            Self::BodyError { source } => source.status_code(),
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::ResponseError { .. } | Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn from_read(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::TimedOut { Self::Timeout } else { Self::Io { source: e } }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("bad request")]
    BadRequest,

    #[error("request method is not supported")]
    MethodNotImplemented,

    #[error("protocol is not supported")]
    UnsupportedProtocol,

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("header fields exceed the limit {max_size}")]
    HeaderFieldsTooLarge { max_size: usize },

    #[error("request URI exceed the limit {max_size}")]
    UriTooLong { max_size: usize },

    #[error("invalid URI encoding")]
    UriDecoding,

    #[error("malformed encoding token list")]
    UnsupportedEncoding,

    #[error("encoding tokens exceed the limit {max_num}")]
    TooManyEncodingTokens { max_num: usize },
}

impl ParseError {
    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn header_fields_too_large(max_size: usize) -> Self {
        Self::HeaderFieldsTooLarge { max_size }
    }

    pub fn uri_too_long(max_size: usize) -> Self {
        Self::UriTooLong { max_size }
    }

    pub fn too_many_encoding_tokens(max_num: usize) -> Self {
        Self::TooManyEncodingTokens { max_num }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest | Self::UriDecoding | Self::UnsupportedEncoding | Self::TooManyEncodingTokens { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::MethodNotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::UnsupportedProtocol => StatusCode::HTTP_VERSION_NOT_SUPPORTED,
            Self::TooManyHeaders { .. } | Self::HeaderFieldsTooLarge { .. } => {
                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
            }
            Self::UriTooLong { .. } => StatusCode::URI_TOO_LONG,
        }
    }
}

#[derive(Error, Debug)]
pub enum BodyError {
    #[error("invalid chunk: {reason}")]
    BadChunk { reason: &'static str },

    #[error("body exceed the limit {max_size}")]
    BodyTooLarge { max_size: u64 },

    #[error("transfer coding {token:?} is not implemented")]
    EncodingNotImplemented { token: String },

    #[error("decompress error: {source}")]
    Decompress { source: io::Error },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl BodyError {
    pub fn bad_chunk(reason: &'static str) -> Self {
        Self::BadChunk { reason }
    }

    pub fn body_too_large(max_size: u64) -> Self {
        Self::BodyTooLarge { max_size }
    }

    pub fn not_implemented<S: ToString>(token: S) -> Self {
        Self::EncodingNotImplemented { token: token.to_string() }
    }

    pub fn decompress(source: io::Error) -> Self {
        Self::Decompress { source }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadChunk { .. } | Self::Decompress { .. } => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::EncodingNotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            Self::Io { source } if source.kind() == io::ErrorKind::TimedOut => StatusCode::REQUEST_TIMEOUT,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(HttpError, u16)> = vec![
            (ParseError::BadRequest.into(), 400),
            (ParseError::MethodNotImplemented.into(), 501),
            (ParseError::UnsupportedProtocol.into(), 505),
            (ParseError::too_many_headers(50).into(), 431),
            (ParseError::header_fields_too_large(1024).into(), 431),
            (ParseError::uri_too_long(16).into(), 414),
            (ParseError::too_many_encoding_tokens(4).into(), 400),
            (BodyError::bad_chunk("size").into(), 400),
            (BodyError::body_too_large(1).into(), 413),
            (BodyError::not_implemented("br").into(), 501),
            (HttpError::Timeout, 408),
            (SendError::invalid_body("broken").into(), 500),
        ];

        for (error, code) in cases {
            assert_eq!(error.status_code().as_u16(), code, "{error}");
        }
    }

    #[test]
    fn test_from_read() {
        let timeout = HttpError::from_read(io::Error::from(io::ErrorKind::TimedOut));
        assert!(matches!(timeout, HttpError::Timeout));

        let reset = HttpError::from_read(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(matches!(reset, HttpError::Io { .. }));
    }
}
