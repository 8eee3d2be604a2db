//! The request value populated by the parser.
//!
//! A connection owns exactly one [`Request`]; the parser fills it, the router
//! reads it, and [`Request::clear`] resets it for the next request on the same
//! keep-alive connection without giving back its allocations.

use crate::protocol::{Headers, Method, Protocol, Query};
use crate::utils::eq_ignore_case;

/// Encoding token lists discovered while parsing headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoding {
    /// `Transfer-Encoding` tokens, in order of application.
    pub transfer: Vec<String>,
    /// `Content-Encoding` tokens, in order of application.
    pub content: Vec<String>,
    /// `Accept-Encoding` tokens, in order of preference as sent.
    pub accept: Vec<String>,
    /// The last transfer coding is `chunked`.
    pub chunked: bool,
    /// A `Trailer` header announced trailer fields.
    pub trailer: bool,
}

impl Encoding {
    pub fn clear(&mut self) {
        self.transfer.clear();
        self.content.clear();
        self.accept.clear();
        self.chunked = false;
        self.trailer = false;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Query,
    pub(crate) protocol: Protocol,
    pub(crate) headers: Headers,
    pub(crate) content_length: u64,
    pub(crate) content_type: String,
    pub(crate) encoding: Encoding,
    pub(crate) connection: String,
    pub(crate) upgrade: Option<Protocol>,
    pub(crate) expect_continue: bool,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(headers: usize) -> Self {
        Self { headers: Headers::with_capacity(headers), ..Self::default() }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Percent-decoded path, or the verbatim absolute URI.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    /// Raw value of the `Connection` header, empty if absent.
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// HTTP/1.x version the client asked to upgrade to, if any.
    pub fn upgrade(&self) -> Option<Protocol> {
        self.upgrade
    }

    pub fn expects_continue(&self) -> bool {
        self.expect_continue
    }

    /// Whether the connection stays open after the response to this request.
    ///
    /// HTTP/1.0 requires an explicit `keep-alive`, HTTP/1.1 stays open unless
    /// the client sent `close`.
    pub fn is_keep_alive(&self) -> bool {
        match self.protocol {
            Protocol::Http10 => eq_ignore_case(&self.connection, "keep-alive"),
            Protocol::Http11 => !eq_ignore_case(&self.connection, "close"),
            Protocol::Unknown => false,
        }
    }

    pub fn clear(&mut self) {
        self.method = Method::default();
        self.path.clear();
        self.query.clear();
        self.protocol = Protocol::default();
        self.headers.clear();
        self.content_length = 0;
        self.content_type.clear();
        self.encoding.clear();
        self.connection.clear();
        self.upgrade = None;
        self.expect_continue = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keep_alive() {
        let mut request = Request::new();
        request.protocol = Protocol::Http11;
        assert!(request.is_keep_alive());

        request.connection.push_str("Close");
        assert!(!request.is_keep_alive());

        request.protocol = Protocol::Http10;
        request.connection.clear();
        assert!(!request.is_keep_alive());

        request.connection.push_str("Keep-Alive");
        assert!(request.is_keep_alive());
    }

    #[test]
    fn test_clear() {
        let mut request = Request::with_capacity(4);
        request.method = Method::Post;
        request.path.push_str("/upload");
        request.headers.add("Host", "localhost");
        request.content_length = 13;
        request.encoding.chunked = true;
        request.upgrade = Some(Protocol::Http11);

        request.clear();
        assert_eq!(request, Request::new());
    }
}
