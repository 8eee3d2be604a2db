//! Renders a [`Response`] into wire bytes.
//!
//! The head is written as: status line, the response's own headers, the
//! configured default headers the response did not override, cookies, then
//! the framing headers the serializer owns (`Content-Encoding`,
//! `Content-Length` or `Transfer-Encoding`).
//!
//! All output goes through one buffer with a logical capacity:
//!
//! - a sized body that does not fit grows the buffer once, to exactly fit
//!   head and body, never beyond the configured maximum
//! - an unsized or compressed body is written as chunks; after each flush
//!   the capacity doubles (up to the maximum) when no more than 1/64 of it
//!   was left free

use bytes::{BufMut, BytesMut};
use http::StatusCode;
use http_body_util::BodyExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{trace, warn};

use crate::codec::{CodecCache, Compressor, LAST_CHUNK, MIN_CHUNK_SIZE, write_chunk};
use crate::config::Config;
use crate::connection::BufferedClient;
use crate::ensure;
use crate::protocol::{ContentEncoding, Cookie, Headers, Method, PayloadSize, Protocol, Request, Response, ResponseBody, SendError};
use crate::utils::{eq_ignore_case, has_line_break};

const NONSTANDARD: &str = "Nonstandard";
const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// A default header with its line rendered once per connection.
#[derive(Debug)]
struct DefaultHeader {
    key: String,
    line: Vec<u8>,
    /// Overridden by the response being written.
    excluded: bool,
}

#[derive(Debug)]
pub struct ResponseSerializer {
    buf: BytesMut,
    capacity: usize,
    max_size: usize,
    defaults: Vec<DefaultHeader>,
}

impl ResponseSerializer {
    /// Creates a serializer whose default headers are the configured ones plus
    /// an `Accept-Encoding` advertising `codecs`, unless one is configured.
    pub fn new(config: &Config, codecs: &CodecCache) -> Self {
        let capacity = config.net.write_buffer.default.max(MIN_CHUNK_SIZE);
        let max_size = config.net.write_buffer.maximal.max(capacity);

        let mut defaults: Vec<DefaultHeader> = config
            .headers
            .default
            .iter()
            .filter(|(key, value)| {
                let broken = has_line_break(key) || has_line_break(value);
                if broken {
                    warn!(key = %key, "default header contains a line break, skipped");
                }
                !broken
            })
            .map(|(key, value)| DefaultHeader::new(key, value))
            .collect();
        if !defaults.iter().any(|header| eq_ignore_case(&header.key, "accept-encoding")) {
            defaults.push(DefaultHeader::new("Accept-Encoding", &codecs.accept_encoding()));
        }

        Self { buf: BytesMut::with_capacity(capacity), capacity, max_size, defaults }
    }

    /// Current logical size of the output buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Writes the interim `100 Continue` response.
    pub async fn write_continue<R, W>(&mut self, client: &mut BufferedClient<R, W>) -> Result<(), SendError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        client.write_all(CONTINUE).await?;
        client.flush().await?;
        Ok(())
    }

    /// Writes the `101 Switching Protocols` response preceding the real one.
    pub async fn pre_write<R, W>(&mut self, client: &mut BufferedClient<R, W>, upgrade: Protocol) -> Result<(), SendError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.buf.put_slice(b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: ");
        self.buf.put_slice(upgrade.as_str().as_bytes());
        self.buf.put_slice(b"\r\n\r\n");
        let result = self.flush(client).await;
        self.buf.clear();
        result?;
        client.flush().await?;
        Ok(())
    }

    /// Serializes `response` as the answer to `request` and flushes it.
    ///
    /// With `close` set and no `Connection` header on the response, a
    /// `Connection: close` line tells the peer this is the last response.
    pub async fn write<R, W>(
        &mut self,
        client: &mut BufferedClient<R, W>,
        codecs: &mut CodecCache,
        request: &Request,
        response: Response,
        close: bool,
    ) -> Result<(), SendError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.write_response(client, codecs, request, response, close).await;

        for header in &mut self.defaults {
            header.excluded = false;
        }
        self.buf.clear();

        result
    }

    async fn write_response<R, W>(
        &mut self,
        client: &mut BufferedClient<R, W>,
        codecs: &mut CodecCache,
        request: &Request,
        response: Response,
        close: bool,
    ) -> Result<(), SendError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Response { code, status, headers, cookies, encoding, body, .. } = response;

        let token = negotiate(codecs, request, &encoding, &body);
        let size = if token.is_some() { PayloadSize::Chunked } else { body.payload_size() };

        self.put_status_line(request.protocol(), code, status.as_deref());
        self.put_headers(&headers, token.is_some());
        if close && !headers.contains("connection") {
            self.buf.put_slice(b"Connection: close\r\n");
        }
        self.put_defaults();
        for cookie in &cookies {
            if cookie_has_line_break(cookie) {
                warn!(name = %cookie.name, "cookie contains a line break, skipped");
                continue;
            }
            put_cookie(&mut self.buf, cookie);
        }
        if let Some(token) = token {
            self.buf.put_slice(b"Content-Encoding: ");
            self.buf.put_slice(token.as_bytes());
            self.buf.put_slice(b"\r\n");
        }

        let skip_body = request.method() == Method::Head;
        trace!(status = code.as_u16(), ?size, compress = token, "write response head");

        match size {
            PayloadSize::Empty => self.buf.put_slice(b"Content-Length: 0\r\n\r\n"),
            PayloadSize::Length(length) => {
                self.buf.put_slice(b"Content-Length: ");
                put_decimal(&mut self.buf, length);
                self.buf.put_slice(b"\r\n\r\n");
                if !skip_body {
                    self.write_sized(client, body, length).await?;
                }
            }
            PayloadSize::Chunked => {
                self.buf.put_slice(b"Transfer-Encoding: chunked\r\n\r\n");
                if !skip_body {
                    self.write_unsized(client, codecs, body, token).await?;
                }
            }
        }

        self.flush(client).await?;
        client.flush().await?;
        Ok(())
    }

    fn put_status_line(&mut self, protocol: Protocol, code: StatusCode, status: Option<&str>) {
        let reason = status
            .filter(|status| !has_line_break(status))
            .or_else(|| code.canonical_reason())
            .unwrap_or(NONSTANDARD);

        self.buf.put_slice(protocol.as_str().as_bytes());
        self.buf.put_u8(b' ');
        self.buf.put_slice(code.as_str().as_bytes());
        self.buf.put_u8(b' ');
        self.buf.put_slice(reason.as_bytes());
        self.buf.put_slice(b"\r\n");
    }

    fn put_headers(&mut self, headers: &Headers, compressed: bool) {
        for (key, value) in headers.iter() {
            if eq_ignore_case(key, "content-length")
                || eq_ignore_case(key, "transfer-encoding")
                || (compressed && eq_ignore_case(key, "content-encoding"))
            {
                continue;
            }
            if has_line_break(key) || has_line_break(value) {
                warn!(key, "response header contains a line break, skipped");
                continue;
            }

            for header in self.defaults.iter_mut().filter(|header| eq_ignore_case(&header.key, key)) {
                header.excluded = true;
            }

            self.buf.put_slice(key.as_bytes());
            self.buf.put_slice(b": ");
            self.buf.put_slice(value.as_bytes());
            self.buf.put_slice(b"\r\n");
        }
    }

    fn put_defaults(&mut self) {
        for header in self.defaults.iter().filter(|header| !header.excluded) {
            self.buf.put_slice(&header.line);
        }
    }

    async fn write_sized<R, W>(
        &mut self,
        client: &mut BufferedClient<R, W>,
        body: ResponseBody,
        length: u64,
    ) -> Result<(), SendError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let needed = self.buf.len().saturating_add(usize::try_from(length).unwrap_or(usize::MAX));
        if needed > self.capacity && self.capacity < self.max_size {
            let grown = needed.min(self.max_size);
            trace!(from = self.capacity, to = grown, "grow write buffer to fit body");
            self.capacity = grown;
            self.buf.reserve(grown - self.buf.len());
        }

        match body {
            ResponseBody::Empty => Ok(()),
            ResponseBody::Full(bytes) => self.put_sized(client, &bytes).await,
            ResponseBody::Stream(mut stream) => {
                let mut written = 0u64;
                while let Some(frame) = stream.frame().await {
                    let Ok(data) = frame.map_err(SendError::invalid_body)?.into_data() else {
                        continue;
                    };
                    written += data.len() as u64;
                    ensure!(written <= length, SendError::invalid_body("stream body is longer than its declared size"));
                    self.put_sized(client, &data).await?;
                }
                ensure!(written == length, SendError::invalid_body("stream body is shorter than its declared size"));
                Ok(())
            }
        }
    }

    async fn put_sized<R, W>(&mut self, client: &mut BufferedClient<R, W>, mut data: &[u8]) -> Result<(), SendError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while !data.is_empty() {
            let free = self.capacity.saturating_sub(self.buf.len());
            if free == 0 {
                self.flush(client).await?;
                continue;
            }

            let n = free.min(data.len());
            self.buf.put_slice(&data[..n]);
            data = &data[n..];
        }
        Ok(())
    }

    async fn write_unsized<R, W>(
        &mut self,
        client: &mut BufferedClient<R, W>,
        codecs: &mut CodecCache,
        body: ResponseBody,
        token: Option<&str>,
    ) -> Result<(), SendError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut compressor: Option<&mut dyn Compressor> = match token {
            Some(token) => {
                let compressor = codecs
                    .compressor(token)
                    .ok_or_else(|| SendError::invalid_body(format!("no compressor for {token}")))?;
                compressor.reset();
                Some(compressor)
            }
            None => None,
        };

        match body {
            ResponseBody::Empty => {}
            ResponseBody::Full(bytes) => {
                let data = match compressor.as_mut() {
                    Some(compressor) => compressor.write(&bytes)?,
                    None => bytes,
                };
                self.write_chunked(client, &data).await?;
            }
            ResponseBody::Stream(mut stream) => {
                while let Some(frame) = stream.frame().await {
                    let Ok(data) = frame.map_err(SendError::invalid_body)?.into_data() else {
                        continue;
                    };
                    let data = match compressor.as_mut() {
                        Some(compressor) => compressor.write(&data)?,
                        None => data,
                    };
                    self.write_chunked(client, &data).await?;
                }
            }
        }

        if let Some(compressor) = compressor {
            let tail = compressor.finish()?;
            self.write_chunked(client, &tail).await?;
        }

        if self.capacity.saturating_sub(self.buf.len()) < LAST_CHUNK.len() {
            self.flush_and_grow(client).await?;
        }
        self.buf.put_slice(LAST_CHUNK);
        Ok(())
    }

    /// Frames `data` as chunks, flushing whenever the buffer cannot take one more.
    async fn write_chunked<R, W>(&mut self, client: &mut BufferedClient<R, W>, mut data: &[u8]) -> Result<(), SendError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while !data.is_empty() {
            let free = self.capacity.saturating_sub(self.buf.len());
            let n = write_chunk(&mut self.buf, free, data);
            if n == 0 {
                self.flush_and_grow(client).await?;
                continue;
            }
            data = &data[n..];
        }
        Ok(())
    }

    async fn flush_and_grow<R, W>(&mut self, client: &mut BufferedClient<R, W>) -> Result<(), SendError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let free = self.capacity.saturating_sub(self.buf.len());
        self.flush(client).await?;

        if free <= self.capacity / 64 && self.capacity < self.max_size {
            let grown = self.capacity.saturating_mul(2).min(self.max_size);
            trace!(from = self.capacity, to = grown, "grow write buffer");
            self.capacity = grown;
            self.buf.reserve(grown);
        }
        Ok(())
    }

    async fn flush<R, W>(&mut self, client: &mut BufferedClient<R, W>) -> Result<(), SendError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if self.buf.is_empty() {
            return Ok(());
        }

        trace!(bytes = self.buf.len(), "flush response bytes");
        client.write_all(&self.buf).await?;
        self.buf.clear();
        Ok(())
    }
}

impl DefaultHeader {
    fn new(key: &str, value: &str) -> Self {
        let line = [key.as_bytes(), b": ", value.as_bytes(), b"\r\n"].concat();
        Self { key: key.to_string(), line, excluded: false }
    }
}

/// The content coding applied to the body, if any.
fn negotiate<'a>(
    codecs: &CodecCache,
    request: &'a Request,
    encoding: &'a ContentEncoding,
    body: &ResponseBody,
) -> Option<&'a str> {
    if body.payload_size().is_empty() {
        return None;
    }

    match encoding {
        ContentEncoding::Identity => None,
        ContentEncoding::Auto => request.encoding().accept.iter().map(String::as_str).find(|token| codecs.supports(token)),
        ContentEncoding::Token(token) if codecs.supports(token) => Some(token),
        ContentEncoding::Token(token) => {
            warn!(token, "content coding is not registered, sending identity");
            None
        }
    }
}

fn cookie_has_line_break(cookie: &Cookie) -> bool {
    [Some(&cookie.name), Some(&cookie.value), cookie.path.as_ref(), cookie.domain.as_ref()]
        .into_iter()
        .flatten()
        .any(|field| has_line_break(field))
}

fn put_cookie(dst: &mut BytesMut, cookie: &Cookie) {
    dst.put_slice(b"Set-Cookie: ");
    dst.put_slice(cookie.name.as_bytes());
    dst.put_u8(b'=');
    dst.put_slice(cookie.value.as_bytes());

    if let Some(path) = &cookie.path {
        dst.put_slice(b"; Path=");
        dst.put_slice(path.as_bytes());
    }
    if let Some(domain) = &cookie.domain {
        dst.put_slice(b"; Domain=");
        dst.put_slice(domain.as_bytes());
    }
    if let Some(expires) = cookie.expires {
        dst.put_slice(b"; Expires=");
        dst.put_slice(httpdate::fmt_http_date(expires).as_bytes());
    }
    if cookie.max_age != 0 {
        dst.put_slice(b"; Max-Age=");
        put_decimal(dst, cookie.max_age.max(0).unsigned_abs());
    }
    if let Some(same_site) = cookie.same_site {
        dst.put_slice(b"; SameSite=");
        dst.put_slice(same_site.as_str().as_bytes());
    }
    if cookie.secure {
        dst.put_slice(b"; Secure");
    }
    if cookie.http_only {
        dst.put_slice(b"; HttpOnly");
    }

    dst.put_slice(b"\r\n");
}

fn put_decimal(dst: &mut BytesMut, mut n: u64) {
    let mut digits = [0u8; 20];
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    dst.put_slice(&digits[i..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ChunkedDecoder, Codec, Gzip};
    use crate::protocol::{PayloadItem, SameSite};
    use bytes::Bytes;
    use http_body::Frame;
    use http_body_util::StreamBody;
    use std::convert::Infallible;
    use std::task::Poll;
    use std::time::{Duration, SystemTime};

    type Client = BufferedClient<&'static [u8], Vec<u8>>;

    fn client(config: &Config) -> Client {
        BufferedClient::new(&b""[..], Vec::new(), &config.net)
    }

    fn get() -> Request {
        Request { method: Method::Get, path: "/".into(), protocol: Protocol::Http11, ..Request::default() }
    }

    async fn serialize(config: &Config, request: &Request, responses: Vec<Response>) -> (Vec<u8>, ResponseSerializer) {
        let mut codecs = CodecCache::default();
        let mut serializer = ResponseSerializer::new(config, &codecs);
        let mut client = client(config);
        for response in responses {
            serializer.write(&mut client, &mut codecs, request, response, false).await.unwrap();
        }
        let (_, written, _) = client.into_parts();
        (written, serializer)
    }

    /// Parses the head of `wire`, returning (code, headers, body offset).
    fn parse_head(wire: &[u8]) -> (u16, Vec<(String, String)>, usize) {
        let mut headers = [httparse::EMPTY_HEADER; 32];
        let mut response = httparse::Response::new(&mut headers);
        let httparse::Status::Complete(offset) = response.parse(wire).unwrap() else {
            panic!("incomplete response head");
        };
        let headers = response
            .headers
            .iter()
            .map(|h| (h.name.to_string(), String::from_utf8(h.value.to_vec()).unwrap()))
            .collect();
        (response.code.unwrap(), headers, offset)
    }

    fn header<'a>(headers: &'a [(String, String)], key: &str) -> Option<&'a str> {
        headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v.as_str())
    }

    fn dechunk(mut wire: Bytes) -> Vec<u8> {
        let mut decoder = ChunkedDecoder::new();
        let mut body = Vec::new();
        loop {
            match decoder.parse(&mut wire) {
                Poll::Ready(Ok(PayloadItem::Chunk(data))) => body.extend_from_slice(&data),
                Poll::Ready(Ok(PayloadItem::Eof)) => return body,
                other => panic!("unexpected chunked framing: {other:?}"),
            }
        }
    }

    fn unsized_body(pieces: &[&'static str]) -> StreamBody<futures::stream::Iter<std::vec::IntoIter<Result<Frame<Bytes>, Infallible>>>> {
        let frames: Vec<_> = pieces.iter().map(|piece| Ok(Frame::data(Bytes::from_static(piece.as_bytes())))).collect();
        StreamBody::new(futures::stream::iter(frames))
    }

    #[tokio::test]
    async fn test_sized_body_without_growth() {
        let config = Config::default().with_write_buffer(8192, 65536);
        let body = "x".repeat(4096);
        let (wire, serializer) = serialize(&config, &get(), vec![Response::new().string(body.clone())]).await;

        let (code, headers, offset) = parse_head(&wire);
        assert_eq!(code, 200);
        assert_eq!(headers.iter().filter(|(k, _)| k == "Content-Length").count(), 1);
        assert_eq!(header(&headers, "content-length"), Some("4096"));
        assert!(header(&headers, "transfer-encoding").is_none());
        assert_eq!(&wire[offset..], body.as_bytes());
        assert_eq!(serializer.capacity(), 8192);
    }

    #[tokio::test]
    async fn test_sized_body_grows_once_to_fit() {
        let config = Config::default().with_write_buffer(128, 1024);
        let head = "HTTP/1.1 200 OK\r\nAccept-Encoding: gzip, deflate, zstd\r\nContent-Length: 00\r\n\r\n".len();

        let exact = "a".repeat(128 - head);
        let (wire, serializer) = serialize(&config, &get(), vec![Response::new().string(exact)]).await;
        assert_eq!(wire.len(), 128);
        assert_eq!(serializer.capacity(), 128);

        let over = "a".repeat(128 - head + 1);
        let (wire, serializer) = serialize(&config, &get(), vec![Response::new().string(over)]).await;
        assert_eq!(wire.len(), 129);
        assert_eq!(serializer.capacity(), 129);

        let huge = "a".repeat(4096);
        let (wire, serializer) = serialize(&config, &get(), vec![Response::new().string(huge)]).await;
        let (_, _, offset) = parse_head(&wire);
        assert_eq!(wire.len() - offset, 4096);
        assert_eq!(serializer.capacity(), 1024);
    }

    #[tokio::test]
    async fn test_gzip_on_unsized_stream() {
        let config = Config::default();
        let response = Response::new().stream(unsized_body(&["Hello, ", "compressed ", "world!"])).compress("gzip");
        let (wire, _) = serialize(&config, &get(), vec![response]).await;

        let (_, headers, offset) = parse_head(&wire);
        assert_eq!(header(&headers, "transfer-encoding"), Some("chunked"));
        assert_eq!(header(&headers, "content-encoding"), Some("gzip"));
        assert!(header(&headers, "content-length").is_none());

        let compressed = dechunk(Bytes::copy_from_slice(&wire[offset..]));
        let mut decompressor = Gzip.new_decompressor();
        let mut plain = decompressor.write(&compressed).unwrap().to_vec();
        plain.extend_from_slice(&decompressor.finish().unwrap());
        assert_eq!(plain, b"Hello, compressed world!");
    }

    #[tokio::test]
    async fn test_sized_body_is_downgraded_when_compressed() {
        let mut request = get();
        request.encoding.accept = vec!["br".into(), "deflate".into()];
        let response = Response::new().string("negotiated body").compress("auto");
        let (wire, _) = serialize(&Config::default(), &request, vec![response]).await;

        let (_, headers, _) = parse_head(&wire);
        assert_eq!(header(&headers, "content-encoding"), Some("deflate"));
        assert_eq!(header(&headers, "transfer-encoding"), Some("chunked"));
        assert!(header(&headers, "content-length").is_none());
    }

    #[tokio::test]
    async fn test_unsized_stream_without_compression() {
        let response = Response::new().stream(unsized_body(&["Mozilla", "Developer", "", "Network"]));
        let (wire, _) = serialize(&Config::default(), &get(), vec![response]).await;

        let (_, headers, offset) = parse_head(&wire);
        assert_eq!(header(&headers, "transfer-encoding"), Some("chunked"));
        assert_eq!(dechunk(Bytes::copy_from_slice(&wire[offset..])), b"MozillaDeveloperNetwork");
        assert!(wire.ends_with(LAST_CHUNK));
    }

    async fn chunked_with_limits(capacity: usize, max_size: usize, body: &[u8]) -> Vec<u8> {
        let config = Config::default().with_write_buffer(capacity, max_size);
        let codecs = CodecCache::default();
        let mut serializer = ResponseSerializer::new(&config, &codecs);
        let mut client = client(&config);

        serializer.write_chunked(&mut client, body).await.unwrap();
        if serializer.capacity.saturating_sub(serializer.buf.len()) < LAST_CHUNK.len() {
            serializer.flush_and_grow(&mut client).await.unwrap();
        }
        serializer.buf.put_slice(LAST_CHUNK);
        serializer.flush(&mut client).await.unwrap();

        client.into_parts().1
    }

    #[tokio::test]
    async fn test_chunked_growth_policy() {
        let fixed = chunked_with_limits(7, 7, b"Hello, world!").await;
        assert_eq!(fixed, b"2\r\nHe\r\n2\r\nll\r\n2\r\no,\r\n2\r\n w\r\n2\r\nor\r\n2\r\nld\r\n1\r\n!\r\n0\r\n\r\n");

        let grown = chunked_with_limits(7, 14, b"Hello, world!").await;
        assert_eq!(grown, b"2\r\nHe\r\n9\r\nllo, worl\r\n2\r\nd!\r\n0\r\n\r\n");
    }

    #[tokio::test]
    async fn test_head_skips_body() {
        let request = Request { method: Method::Head, ..get() };
        let (wire, _) = serialize(&Config::default(), &request, vec![Response::new().string("hello")]).await;

        let (_, headers, offset) = parse_head(&wire);
        assert_eq!(header(&headers, "content-length"), Some("5"));
        assert_eq!(offset, wire.len());
    }

    #[tokio::test]
    async fn test_status_line() {
        let request = Request { protocol: Protocol::Http10, ..get() };
        let responses = vec![
            Response::new().code(StatusCode::NOT_FOUND),
            Response::new().code(StatusCode::IM_A_TEAPOT).status("Short And Stout"),
            Response::new().code(StatusCode::from_u16(599).unwrap()),
        ];
        let (wire, _) = serialize(&Config::default(), &request, responses).await;
        let wire = String::from_utf8(wire).unwrap();

        assert!(wire.starts_with("HTTP/1.0 404 Not Found\r\n"));
        assert!(wire.contains("HTTP/1.0 418 Short And Stout\r\n"));
        assert!(wire.contains("HTTP/1.0 599 Nonstandard\r\n"));
    }

    #[tokio::test]
    async fn test_default_header_overlay() {
        let config = Config::default().with_default_header("Server", "weft").with_default_header("X-Frame-Options", "DENY");
        let responses = vec![Response::new().header("server", "custom"), Response::new()];
        let (wire, _) = serialize(&config, &get(), responses).await;

        let (_, first, offset) = parse_head(&wire);
        assert_eq!(header(&first, "server"), Some("custom"));
        assert_eq!(first.iter().filter(|(k, _)| k.eq_ignore_ascii_case("server")).count(), 1);
        assert_eq!(header(&first, "x-frame-options"), Some("DENY"));
        assert_eq!(header(&first, "accept-encoding"), Some("gzip, deflate, zstd"));

        let (_, second, _) = parse_head(&wire[offset..]);
        assert_eq!(header(&second, "server"), Some("weft"));
    }

    #[tokio::test]
    async fn test_framing_headers_are_owned_by_serializer() {
        let response = Response::new().header("Content-Length", "999").header("Transfer-Encoding", "gzip").string("hi");
        let (wire, _) = serialize(&Config::default(), &get(), vec![response]).await;

        let (_, headers, offset) = parse_head(&wire);
        assert_eq!(header(&headers, "content-length"), Some("2"));
        assert!(header(&headers, "transfer-encoding").is_none());
        assert_eq!(&wire[offset..], b"hi");
    }

    #[tokio::test]
    async fn test_cookies() {
        let expires = SystemTime::UNIX_EPOCH + Duration::from_secs(784_111_777);
        let cookie = Cookie::builder("id", "a3fWa")
            .path("/")
            .domain("example.com")
            .expires(expires)
            .max_age(3600)
            .same_site(SameSite::Lax)
            .secure(true)
            .http_only(true);
        let responses = vec![Response::new().cookie(cookie).cookie(Cookie::builder("gone", "").max_age(-1))];
        let (wire, _) = serialize(&Config::default(), &get(), responses).await;
        let wire = String::from_utf8(wire).unwrap();

        assert!(wire.contains(
            "Set-Cookie: id=a3fWa; Path=/; Domain=example.com; Expires=Sun, 06 Nov 1994 08:49:37 GMT; Max-Age=3600; SameSite=Lax; Secure; HttpOnly\r\n"
        ));
        assert!(wire.contains("Set-Cookie: gone=; Max-Age=0\r\n"));
    }

    #[tokio::test]
    async fn test_line_breaks_never_reach_the_wire() {
        let config = Config::default().with_default_header("X-Bad", "a\r\nX-Injected: default");
        let response = Response::new()
            .status("OK\r\nX-Injected: status")
            .header("X-Safe", "kept")
            .header("X-Split", "a\r\nX-Injected: header")
            .header("X-Bad\nKey", "b")
            .cookie(Cookie::new("id", "1\r\nX-Injected: cookie"))
            .cookie(Cookie::new("theme", "dark"))
            .string("body");
        let (wire, _) = serialize(&config, &get(), vec![response]).await;

        let (code, headers, offset) = parse_head(&wire);
        assert_eq!(code, 200);
        assert_eq!(header(&headers, "x-safe"), Some("kept"));
        assert_eq!(header(&headers, "set-cookie"), Some("theme=dark"));
        assert!(header(&headers, "x-injected").is_none());
        assert!(header(&headers, "x-split").is_none());
        assert!(header(&headers, "x-bad").is_none());
        assert!(wire.starts_with(b"HTTP/1.1 200 OK\r\n"));
        assert_eq!(&wire[offset..], b"body");
    }

    #[tokio::test]
    async fn test_sized_stream_length_mismatch() {
        let config = Config::default();
        let mut codecs = CodecCache::default();
        let mut serializer = ResponseSerializer::new(&config, &codecs);
        let mut client = client(&config);

        let response = Response::new().stream(http_body_util::Full::new(Bytes::from_static(b"abc")));
        serializer.write(&mut client, &mut codecs, &get(), response, false).await.unwrap();

        let lying = Response::new().stream(LyingBody(Some(Bytes::from_static(b"way too long"))));
        let err = serializer.write(&mut client, &mut codecs, &get(), lying, false).await.unwrap_err();
        assert!(matches!(err, SendError::InvalidBody { .. }));
    }

    /// Declares 4 bytes but yields more.
    struct LyingBody(Option<Bytes>);

    impl http_body::Body for LyingBody {
        type Data = Bytes;
        type Error = Infallible;

        fn poll_frame(
            mut self: std::pin::Pin<&mut Self>,
            _: &mut std::task::Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
            Poll::Ready(self.0.take().map(|data| Ok(Frame::data(data))))
        }

        fn size_hint(&self) -> http_body::SizeHint {
            http_body::SizeHint::with_exact(4)
        }
    }

    #[tokio::test]
    async fn test_continue_and_upgrade() {
        let config = Config::default();
        let codecs = CodecCache::default();
        let mut serializer = ResponseSerializer::new(&config, &codecs);
        let mut client = client(&config);

        serializer.write_continue(&mut client).await.unwrap();
        serializer.pre_write(&mut client, Protocol::Http11).await.unwrap();

        let wire = client.into_parts().1;
        assert_eq!(
            wire,
            b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: HTTP/1.1\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_connection_close_line() {
        let config = Config::default();
        let mut codecs = CodecCache::default();
        let mut serializer = ResponseSerializer::new(&config, &codecs);
        let mut client = client(&config);

        serializer.write(&mut client, &mut codecs, &get(), Response::new(), true).await.unwrap();
        let wire = String::from_utf8(client.into_parts().1).unwrap();
        assert!(wire.contains("Connection: close\r\n"));
        assert!(wire.ends_with("Content-Length: 0\r\n\r\n"));
    }
}
