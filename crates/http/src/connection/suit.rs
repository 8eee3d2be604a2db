//! The per-connection request/response loop.
//!
//! A [`ConnectionSuit`] owns everything one connection needs: the buffered
//! socket, the parser and the request it fills, the body reader, the codec
//! cache and the serializer. Nothing is shared with other connections except
//! the read-only [`Config`] and the router.
//!
//! Each turn of the loop reads until the parser completes a request head,
//! lets the router answer it, writes the response and then drains whatever
//! the router left of the request body, so the next turn starts at the next
//! request on the wire.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::codec::{CodecCache, Parsed, RequestParser};
use crate::config::Config;
use crate::connection::{BodyReader, BufferedClient, RequestBody, ResponseSerializer};
use crate::handler::Router;
use crate::protocol::{HttpError, Request};

/// What [`ConnectionSuit::serve_once`] left the connection in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ready for the next request.
    KeepAlive,
    /// The peer went away or this was the last response.
    Closed,
    /// The router took the socket over; no response was written.
    Hijacked,
}

/// A connection handed back after the router hijacked it.
#[derive(Debug)]
pub struct HijackedConnection<R, W> {
    pub reader: R,
    pub writer: W,
    /// Bytes already read past the request head.
    pub pending: Option<Bytes>,
    /// The request that triggered the hijack.
    pub request: Request,
}

#[derive(Debug)]
pub struct ConnectionSuit<R, W> {
    client: BufferedClient<R, W>,
    parser: RequestParser,
    request: Request,
    body: BodyReader,
    codecs: CodecCache,
    serializer: ResponseSerializer,
}

impl<R, W> ConnectionSuit<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// A connection with the built-in `gzip`, `deflate` and `zstd` codecs.
    pub fn new(reader: R, writer: W, config: &Arc<Config>) -> Self {
        Self::with_codecs(reader, writer, config, CodecCache::default())
    }

    pub fn with_codecs(reader: R, writer: W, config: &Arc<Config>, codecs: CodecCache) -> Self {
        Self {
            client: BufferedClient::new(reader, writer, &config.net),
            parser: RequestParser::new(config),
            request: Request::with_capacity(config.headers.number.default),
            body: BodyReader::new(config.body.max_size),
            serializer: ResponseSerializer::new(config, &codecs),
            codecs,
        }
    }

    /// Serves requests until the connection closes or is hijacked.
    ///
    /// Returns the socket halves when the router hijacked the connection.
    /// Errors are returned after the error response, if any, was written.
    pub async fn serve<T>(mut self, router: &T) -> Result<Option<HijackedConnection<R, W>>, HttpError>
    where
        T: Router<R, W> + ?Sized,
    {
        loop {
            match self.serve_once(router).await? {
                Outcome::KeepAlive => {}
                Outcome::Closed => {
                    info!("connection closed");
                    return Ok(None);
                }
                Outcome::Hijacked => return Ok(Some(self.into_hijacked())),
            }
        }
    }

    /// Serves a single request.
    pub async fn serve_once<T>(&mut self, router: &T) -> Result<Outcome, HttpError>
    where
        T: Router<R, W> + ?Sized,
    {
        self.request.clear();

        let mut received = false;
        loop {
            let bytes = match self.client.read().await {
                Ok(bytes) => bytes,
                Err(e) if !received => {
                    debug!(cause = %e, "connection idle, closing");
                    return Ok(Outcome::Closed);
                }
                Err(e) => return self.fail(router, HttpError::from_read(e)).await,
            };

            if bytes.is_empty() {
                if received {
                    warn!("peer closed in the middle of a request head");
                }
                return Ok(Outcome::Closed);
            }
            received = true;

            match self.parser.parse(&mut self.request, bytes) {
                Ok(Parsed::Pending) => {}
                Ok(Parsed::Complete(rest)) => {
                    self.client.pushback(rest);
                    break;
                }
                Err(e) => return self.fail(router, e.into()).await,
            }
        }

        if let Err(e) = self.body.init(&self.request, &mut self.codecs) {
            return self.fail(router, e.into()).await;
        }

        let upgraded = self.request.upgrade().is_some();
        if let Some(protocol) = self.request.upgrade() {
            self.serializer.pre_write(&mut self.client, protocol).await?;
            info!(from = %self.request.protocol(), to = %protocol, "protocol upgraded");
            self.request.protocol = protocol;
        }

        if self.request.expects_continue() && !self.body.is_done() {
            self.serializer.write_continue(&mut self.client).await?;
        }

        let mut body = RequestBody::new(&mut self.body, &mut self.client, &mut self.codecs);
        let response = router.on_request(&self.request, &mut body).await;
        if body.is_hijacked() || response.is_hijacked() {
            info!(method = %self.request.method(), path = %self.request.path(), "connection hijacked");
            return Ok(Outcome::Hijacked);
        }

        let failed = self.body.has_failed();
        if failed {
            warn!(method = %self.request.method(), path = %self.request.path(), "request body failed, closing after response");
        }

        let keep_alive = !failed && (upgraded || self.request.is_keep_alive());
        let status = response.status_code();
        self.serializer.write(&mut self.client, &mut self.codecs, &self.request, response, !keep_alive).await?;
        info!(method = %self.request.method(), path = %self.request.path(), status = status.as_u16(), "request served");

        if !keep_alive {
            return Ok(Outcome::Closed);
        }

        self.body.discard(&mut self.client).await?;
        Ok(Outcome::KeepAlive)
    }

    /// Answers `error` through the router, then gives the error back.
    async fn fail<T>(&mut self, router: &T, error: HttpError) -> Result<Outcome, HttpError>
    where
        T: Router<R, W> + ?Sized,
    {
        error!(cause = %error, "failed to process request, closing connection");
        self.parser.reset();

        let response = router.on_error(&self.request, &error).await;
        if let Err(e) = self.serializer.write(&mut self.client, &mut self.codecs, &self.request, response, true).await
        {
            warn!(cause = %e, "failed to send error response");
        }
        Err(error)
    }

    pub fn into_hijacked(self) -> HijackedConnection<R, W> {
        let (reader, writer, pending) = self.client.into_parts();
        HijackedConnection { reader, writer, pending, request: self.request }
    }

    /// Gives the socket halves back, along with any bytes not yet consumed.
    pub fn into_parts(self) -> (R, W, Option<Bytes>) {
        self.client.into_parts()
    }
}
