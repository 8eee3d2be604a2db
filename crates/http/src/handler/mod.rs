//! The seam between a connection and the application.
//!
//! A [`Router`] receives every parsed request together with its
//! [`RequestBody`] and answers with a [`Response`]. It is shared by all
//! connections, hence `Send + Sync`.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::connection::RequestBody;
use crate::protocol::{HttpError, Request, Response};

#[async_trait]
pub trait Router<R, W>: Send + Sync
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Answers a request. Whatever is left of the body afterwards is discarded.
    async fn on_request(&self, request: &Request, body: &mut RequestBody<'_, R, W>) -> Response;

    /// Answers a request that failed before reaching [`on_request`](Router::on_request).
    ///
    /// The connection closes once this response is written. `request` holds
    /// whatever was parsed before the failure.
    async fn on_error(&self, request: &Request, error: &HttpError) -> Response {
        let _ = request;
        Response::from_error(error)
    }
}
