//! Streaming HTTP/1.x request-head parser.
//!
//! [`RequestParser`] consumes the request line and header section from
//! arbitrarily split fragments and fills a caller-owned [`Request`]. Every bit
//! of progress lives in the parser itself, so feeding a request one byte at a
//! time yields exactly the same result as feeding it whole.
//!
//! Input is accepted with either `\r\n` or bare `\n` line endings; a `\r` that
//! is not followed by `\n` is always rejected.
//!
//! The request line and the header fields are accumulated into bounded
//! [`GrowableBuffer`]s; running out of space is reported as
//! [`ParseError::UriTooLong`] or [`ParseError::HeaderFieldsTooLarge`] rather than
//! silently truncating.

use std::borrow::Cow;
use std::ops::Range;

use bytes::Bytes;
use tracing::trace;

use crate::buffer::GrowableBuffer;
use crate::config::Config;
use crate::ensure;
use crate::protocol::{Method, ParseError, Protocol, Request};
use crate::utils::{eq_ignore_case, unhex};

/// Length of `HTTP/1.1`, the longest protocol token accepted.
const MAX_PROTOCOL_LEN: usize = 8;

/// Outcome of feeding one fragment to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// The fragment was consumed entirely, the head is not finished yet.
    Pending,
    /// The head is complete. Holds the bytes following it, the start of the
    /// body or of the next pipelined request.
    Complete(Bytes),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Method,
    Path,
    PathDecode1,
    PathDecode2,
    Query,
    QueryDecode1,
    QueryDecode2,
    Protocol,
    ProtocolLf,
    /// Start of a header line, or the empty line ending the head
    LineStart,
    LineStartLf,
    HeaderKey,
    ContentLength,
    ContentLengthLf,
    /// Optional whitespace between the colon and the value
    HeaderValueStart,
    HeaderValue,
    HeaderValueLf,
}

#[derive(Debug)]
pub struct RequestParser {
    state: State,
    start_line: GrowableBuffer,
    fields: GrowableBuffer,
    key: Range<usize>,
    escaped: u8,
    content_length: u64,
    has_digits: bool,
    transfer_seen: bool,
    max_headers: usize,
    max_encoding_tokens: usize,
}

impl RequestParser {
    pub fn new(config: &Config) -> Self {
        Self {
            state: State::Method,
            start_line: GrowableBuffer::new(config.request_line.default, config.request_line.maximal),
            fields: GrowableBuffer::new(config.headers.space.default, config.headers.space.maximal),
            key: 0..0,
            escaped: 0,
            content_length: 0,
            has_digits: false,
            transfer_seen: false,
            max_headers: config.headers.number.maximal,
            max_encoding_tokens: config.headers.max_encoding_tokens,
        }
    }

    /// Feeds the next fragment of the request head into `request`.
    ///
    /// On [`Parsed::Complete`] the parser is reset and ready for the next
    /// request. After an error the parser must be [`reset`](Self::reset)
    /// before it is used again.
    pub fn parse(&mut self, request: &mut Request, data: Bytes) -> Result<Parsed, ParseError> {
        for (i, &byte) in data.iter().enumerate() {
            if self.step(request, byte)? {
                trace!(method = %request.method, path = %request.path, headers = request.headers.len(), "request head parsed");
                self.reset();
                return Ok(Parsed::Complete(data.slice(i + 1..)));
            }
        }

        Ok(Parsed::Pending)
    }

    pub fn reset(&mut self) {
        self.state = State::Method;
        self.start_line.clear();
        self.fields.clear();
        self.key = 0..0;
        self.escaped = 0;
        self.content_length = 0;
        self.has_digits = false;
        self.transfer_seen = false;
    }

    /// Advances by one byte, returns `true` once the head is complete.
    fn step(&mut self, request: &mut Request, byte: u8) -> Result<bool, ParseError> {
        match self.state {
            State::Method => match byte {
                b' ' => {
                    ensure!(self.start_line.segment_len() > 0, ParseError::BadRequest);
                    request.method = Method::parse(self.start_line.segment()).ok_or(ParseError::MethodNotImplemented)?;
                    self.start_line.clear();
                    self.state = State::Path;
                }
                // empty lines before the request line are ignored
                b'\r' | b'\n' if self.start_line.segment_len() == 0 => {}
                b'\r' | b'\n' => return Err(ParseError::MethodNotImplemented),
                _ => {
                    ensure!(self.start_line.segment_len() < Method::MAX_LEN, ParseError::MethodNotImplemented);
                    self.push_uri(byte)?;
                }
            },

            State::Path => match byte {
                b' ' => {
                    ensure!(self.start_line.segment_len() > 0, ParseError::BadRequest);
                    let path = self.start_line.finish();
                    request.path.push_str(ascii(self.start_line.get(path))?);
                    self.start_line.clear();
                    self.state = State::Protocol;
                }
                b'?' => {
                    let path = self.start_line.finish();
                    if path.is_empty() {
                        request.path.push('/');
                    } else {
                        request.path.push_str(ascii(self.start_line.get(path))?);
                    }
                    self.state = State::Query;
                }
                b'%' => self.state = State::PathDecode1,
                b'#' => return Err(ParseError::BadRequest),
                0x20..=0x7e => self.push_uri(byte)?,
                _ => return Err(ParseError::BadRequest),
            },

            State::PathDecode1 => {
                self.escaped = unhex(byte).ok_or(ParseError::UriDecoding)? << 4;
                self.state = State::PathDecode2;
            }

            State::PathDecode2 => {
                let decoded = self.escaped | unhex(byte).ok_or(ParseError::UriDecoding)?;
                ensure!(is_printable(decoded), ParseError::BadRequest);
                self.push_uri(decoded)?;
                self.state = State::Path;
            }

            // the query is kept raw and decoded lazily, after splitting on `&` and `=`
            State::Query => match byte {
                b' ' => {
                    let query = self.start_line.finish();
                    request.query.set_raw(ascii(self.start_line.get(query))?);
                    self.start_line.clear();
                    self.state = State::Protocol;
                }
                b'%' => {
                    self.push_uri(byte)?;
                    self.state = State::QueryDecode1;
                }
                b'#' => return Err(ParseError::BadRequest),
                0x20..=0x7e => self.push_uri(byte)?,
                _ => return Err(ParseError::BadRequest),
            },

            State::QueryDecode1 | State::QueryDecode2 => {
                ensure!(unhex(byte).is_some(), ParseError::UriDecoding);
                self.push_uri(byte)?;
                self.state = if self.state == State::QueryDecode1 { State::QueryDecode2 } else { State::Query };
            }

            State::Protocol => match byte {
                b'\r' => {
                    request.protocol = self.protocol()?;
                    self.state = State::ProtocolLf;
                }
                b'\n' => {
                    request.protocol = self.protocol()?;
                    self.state = State::LineStart;
                }
                _ => {
                    ensure!(self.start_line.segment_len() < MAX_PROTOCOL_LEN, ParseError::UnsupportedProtocol);
                    ensure!(self.start_line.push(byte), ParseError::UnsupportedProtocol);
                }
            },

            State::ProtocolLf => {
                ensure!(byte == b'\n', ParseError::BadRequest);
                self.state = State::LineStart;
            }

            State::LineStart => match byte {
                b'\r' => self.state = State::LineStartLf,
                b'\n' => return Ok(true),
                _ => {
                    ensure!(request.headers.len() < self.max_headers, ParseError::too_many_headers(self.max_headers));
                    self.state = State::HeaderKey;
                    return self.step(request, byte);
                }
            },

            State::LineStartLf => {
                ensure!(byte == b'\n', ParseError::BadRequest);
                return Ok(true);
            }

            State::HeaderKey => match byte {
                b':' => {
                    ensure!(self.fields.segment_len() > 0, ParseError::BadRequest);
                    self.key = self.fields.finish();
                    if self.fields.get(self.key.clone()).eq_ignore_ascii_case(b"content-length") {
                        self.content_length = 0;
                        self.has_digits = false;
                        self.state = State::ContentLength;
                    } else {
                        self.state = State::HeaderValueStart;
                    }
                }
                0x00..=0x20 | 0x7f => return Err(ParseError::BadRequest),
                _ => self.push_field(byte)?,
            },

            State::ContentLength => match byte {
                b' ' | b'\t' => {}
                b'0'..=b'9' => {
                    self.content_length = self
                        .content_length
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(u64::from(byte - b'0')))
                        .ok_or(ParseError::BadRequest)?;
                    self.has_digits = true;
                }
                b'\r' => {
                    self.finish_content_length(request)?;
                    self.state = State::ContentLengthLf;
                }
                b'\n' => {
                    self.finish_content_length(request)?;
                    self.state = State::LineStart;
                }
                _ => return Err(ParseError::BadRequest),
            },

            State::ContentLengthLf => {
                ensure!(byte == b'\n', ParseError::BadRequest);
                self.state = State::LineStart;
            }

            State::HeaderValueStart => {
                if !matches!(byte, b' ' | b'\t') {
                    self.state = State::HeaderValue;
                    return self.step(request, byte);
                }
            }

            State::HeaderValue => match byte {
                b'\r' => self.state = State::HeaderValueLf,
                b'\n' => {
                    self.finish_header(request)?;
                    self.state = State::LineStart;
                }
                b'\t' => self.push_field(byte)?,
                0x00..=0x1f | 0x7f => return Err(ParseError::BadRequest),
                _ => self.push_field(byte)?,
            },

            State::HeaderValueLf => {
                ensure!(byte == b'\n', ParseError::BadRequest);
                self.finish_header(request)?;
                self.state = State::LineStart;
            }
        }

        Ok(false)
    }

    #[inline]
    fn push_uri(&mut self, byte: u8) -> Result<(), ParseError> {
        ensure!(self.start_line.push(byte), ParseError::uri_too_long(self.start_line.max_size()));
        Ok(())
    }

    #[inline]
    fn push_field(&mut self, byte: u8) -> Result<(), ParseError> {
        ensure!(self.fields.push(byte), ParseError::header_fields_too_large(self.fields.max_size()));
        Ok(())
    }

    fn protocol(&mut self) -> Result<Protocol, ParseError> {
        let token = self.start_line.finish();
        let protocol = Protocol::parse(self.start_line.get(token)).ok_or(ParseError::UnsupportedProtocol)?;
        self.start_line.clear();
        Ok(protocol)
    }

    fn finish_content_length(&mut self, request: &mut Request) -> Result<(), ParseError> {
        ensure!(self.has_digits, ParseError::BadRequest);
        request.content_length = self.content_length;
        let key = String::from_utf8_lossy(self.fields.get(self.key.clone())).into_owned();
        request.headers.add(key, self.content_length.to_string());
        Ok(())
    }

    fn finish_header(&mut self, request: &mut Request) -> Result<(), ParseError> {
        let trailing = self.fields.segment().iter().rev().take_while(|&&b| b == b' ' || b == b'\t').count();
        self.fields.trunc(trailing);
        let value = self.fields.finish();

        let key = String::from_utf8_lossy(self.fields.get(self.key.clone()));
        let value = String::from_utf8_lossy(self.fields.get(value));
        let max_tokens = self.max_encoding_tokens;

        if eq_ignore_case(&key, "connection") {
            request.connection.clear();
            request.connection.push_str(&value);
        } else if eq_ignore_case(&key, "upgrade") {
            request.upgrade = Protocol::choose_upgrade(&value);
        } else if eq_ignore_case(&key, "content-type") {
            request.content_type.clear();
            request.content_type.push_str(&value);
        } else if eq_ignore_case(&key, "accept-encoding") {
            parse_accept_encoding(&value, &mut request.encoding.accept);
        } else if eq_ignore_case(&key, "content-encoding") {
            parse_encoding_tokens(&value, max_tokens, &mut request.encoding.content)?;
        } else if eq_ignore_case(&key, "transfer-encoding") {
            ensure!(!self.transfer_seen, ParseError::BadRequest);
            self.transfer_seen = true;
            parse_encoding_tokens(&value, max_tokens, &mut request.encoding.transfer)?;
            request.encoding.chunked = request.encoding.transfer.last().is_some_and(|token| token == "chunked");
        } else if eq_ignore_case(&key, "trailer") {
            request.encoding.trailer = true;
        } else if eq_ignore_case(&key, "expect") {
            request.expect_continue = eq_ignore_case(&value, "100-continue");
        }

        request.headers.add(Cow::into_owned(key), Cow::into_owned(value));
        Ok(())
    }
}

#[inline]
fn is_printable(byte: u8) -> bool {
    (0x20..=0x7e).contains(&byte)
}

fn ascii(bytes: &[u8]) -> Result<&str, ParseError> {
    std::str::from_utf8(bytes).map_err(|_| ParseError::BadRequest)
}

/// Parses a comma separated coding list strictly: empty tokens are an error.
fn parse_encoding_tokens(value: &str, max_tokens: usize, tokens: &mut Vec<String>) -> Result<(), ParseError> {
    tokens.clear();
    if value.trim().is_empty() {
        return Ok(());
    }

    for token in value.split(',') {
        let token = token.trim();
        ensure!(!token.is_empty(), ParseError::UnsupportedEncoding);
        ensure!(tokens.len() < max_tokens, ParseError::too_many_encoding_tokens(max_tokens));
        tokens.push(token.to_ascii_lowercase());
    }

    Ok(())
}

/// Collects `Accept-Encoding` tokens, dropping quality values and empty entries.
fn parse_accept_encoding(value: &str, tokens: &mut Vec<String>) {
    let accepted = value
        .split(',')
        .filter_map(|token| token.split(';').next())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_lowercase);

    tokens.extend(accepted);
}
