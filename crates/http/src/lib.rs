//! An embeddable HTTP/1.1 engine
//!
//! This crate provides the protocol core of an HTTP/1.1 server: a resumable
//! request parser, chunked transfer coding in both directions, an adaptive
//! response serializer and the per-connection loop gluing them to a socket.
//! Accepting connections, TLS and routing belong to the embedding
//! application.
//!
//! # Features
//!
//! - Request parsing that gives identical results however the input is split
//! - Pipelined and keep-alive requests, with over-read bytes pushed back
//! - Plain, chunked and close-delimited request bodies
//! - `gzip`, `deflate` and `zstd` through swappable per-connection codecs
//! - Default response headers, cookies, `Expect: 100-continue`, protocol
//!   upgrade and connection hijacking
//! - Bounded memory: every buffer has a configured default and maximum size
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use std::sync::Arc;
//! use tokio::io::{AsyncRead, AsyncWrite};
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use weft_http::config::Config;
//! use weft_http::connection::{ConnectionSuit, RequestBody};
//! use weft_http::handler::Router;
//! use weft_http::protocol::{Request, Response};
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl<R, W> Router<R, W> for Hello
//! where
//!     R: AsyncRead + Unpin + Send,
//!     W: AsyncWrite + Unpin + Send,
//! {
//!     async fn on_request(&self, request: &Request, body: &mut RequestBody<'_, R, W>) -> Response {
//!         match body.bytes().await {
//!             Ok(bytes) => {
//!                 info!(path = request.path(), body_len = bytes.len(), "receiving request");
//!                 Response::new().content_type("text/plain").string("Hello World!\r\n").compress("auto")
//!             }
//!             Err(e) => Response::from_error(&e.into()),
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//!     let config = Arc::new(Config::default().with_default_header("Server", "weft"));
//!     let router = Arc::new(Hello);
//!
//!     info!(port = 8080, "start listening");
//!     let listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(listener) => listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     loop {
//!         let (stream, _remote_addr) = match listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let config = Arc::clone(&config);
//!         let router = Arc::clone(&router);
//!         tokio::spawn(async move {
//!             let (reader, writer) = stream.into_split();
//!             let suit = ConnectionSuit::new(reader, writer, &config);
//!             if let Err(e) = suit.serve(router.as_ref()).await {
//!                 error!(cause = %e, "connection shutdown on error");
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`buffer`]: the growable byte arena behind the request line and headers
//! - [`config`]: limits and defaults shared by every connection
//! - [`protocol`]: request, response and error types
//! - [`codec`]: the parser, chunked framing and content codecs, free of I/O
//! - [`connection`]: the buffered socket, body reader, serializer and loop
//! - [`handler`]: the [`handler::Router`] trait the application implements
//!
//! # Error Handling
//!
//! Every failure maps to a status code through
//! [`protocol::HttpError::status_code`]. The connection answers with it
//! through [`handler::Router::on_error`] and closes; it never tries to
//! resynchronize on a broken stream.
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - No TLS (terminate it in front of the engine or wrap the socket)
//! - URI fragments are rejected

pub mod buffer;
pub mod codec;
pub mod config;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
