//! The response value handed back by the router.

use crate::protocol::{Cookie, Headers, HttpError, PayloadSize};
use bytes::Bytes;
use http::StatusCode;
use http_body::Body;
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use std::error::Error;
use std::fmt;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Which content coding the serializer applies to the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContentEncoding {
    #[default]
    Identity,
    /// First token of the request's `Accept-Encoding` the connection supports.
    Auto,
    Token(String),
}

pub enum ResponseBody {
    Empty,
    Full(Bytes),
    /// A streamed body; its size is `size_hint().exact()`, `None` forcing chunked framing.
    Stream(UnsyncBoxBody<Bytes, BoxError>),
}

impl ResponseBody {
    pub fn payload_size(&self) -> PayloadSize {
        match self {
            Self::Empty => PayloadSize::Empty,
            Self::Full(bytes) => PayloadSize::from_hint(Some(bytes.len() as u64)),
            Self::Stream(body) => PayloadSize::from_hint(body.size_hint().exact()),
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(body) => f.debug_tuple("Stream").field(&body.size_hint().exact()).finish(),
        }
    }
}

#[derive(Debug)]
pub struct Response {
    pub(crate) code: StatusCode,
    pub(crate) status: Option<String>,
    pub(crate) headers: Headers,
    pub(crate) cookies: Vec<Cookie>,
    pub(crate) encoding: ContentEncoding,
    pub(crate) body: ResponseBody,
    pub(crate) hijack: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            code: StatusCode::OK,
            status: None,
            headers: Headers::new(),
            cookies: Vec::new(),
            encoding: ContentEncoding::Identity,
            body: ResponseBody::Empty,
            hijack: false,
        }
    }

    /// Builds the response the connection sends for `error`: mapped status, error text as body.
    pub fn from_error(error: &HttpError) -> Self {
        Self::new().code(error.status_code()).string(error.to_string())
    }

    /// Marks the connection as taken over by the handler; nothing is serialized.
    pub fn hijacked() -> Self {
        Self { hijack: true, ..Self::new() }
    }

    #[must_use]
    pub fn code(mut self, code: StatusCode) -> Self {
        self.code = code;
        self
    }

    /// Overrides the reason phrase of the status line.
    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(key, value);
        self
    }

    #[must_use]
    pub fn content_type(self, mime: impl Into<String>) -> Self {
        self.header("Content-Type", mime)
    }

    #[must_use]
    pub fn cookie(mut self, cookie: impl Into<Cookie>) -> Self {
        self.cookies.push(cookie.into());
        self
    }

    #[must_use]
    pub fn string(self, body: impl Into<String>) -> Self {
        self.bytes(Bytes::from(body.into()))
    }

    #[must_use]
    pub fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ResponseBody::Full(body.into());
        self
    }

    #[must_use]
    pub fn stream<B>(mut self, body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        self.body = ResponseBody::Stream(body.map_err(Into::<BoxError>::into).boxed_unsync());
        self
    }

    /// Compresses the body with the given content coding, or `"auto"` to negotiate.
    #[must_use]
    pub fn compress(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.encoding = if token.eq_ignore_ascii_case("auto") {
            ContentEncoding::Auto
        } else if token.eq_ignore_ascii_case("identity") || token.is_empty() {
            ContentEncoding::Identity
        } else {
            ContentEncoding::Token(token)
        };
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn encoding(&self) -> &ContentEncoding {
        &self.encoding
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn is_hijacked(&self) -> bool {
        self.hijack
    }

    pub fn clear(&mut self) {
        self.code = StatusCode::OK;
        self.status = None;
        self.headers.clear();
        self.cookies.clear();
        self.encoding = ContentEncoding::Identity;
        self.body = ResponseBody::Empty;
        self.hijack = false;
    }
}
