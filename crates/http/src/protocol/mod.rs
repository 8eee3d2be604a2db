//! Protocol value types shared by the parser, the serializer and the router.
//!
//! # Overview
//!
//! - **Request side** ([`Request`]): method, decoded path, lazily parsed
//!   [`Query`], [`Protocol`] version, ordered [`Headers`] and the framing
//!   facts the body reader needs ([`Encoding`], content length, connection
//!   token).
//! - **Response side** ([`Response`]): status code and optional reason
//!   override, headers, [`Cookie`]s, [`ContentEncoding`] and a
//!   [`ResponseBody`] that is empty, in memory, or an `http_body::Body`
//!   stream.
//! - **Payload framing** ([`PayloadItem`], [`PayloadSize`]): body pieces and
//!   how a body is framed on the wire.
//! - **Errors** ([`HttpError`], [`ParseError`], [`BodyError`],
//!   [`SendError`]): each maps onto the status code the connection answers
//!   with before it closes.
//!
//! Every value here is owned by a single connection and cleared in place
//! between requests.

mod message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod method;
pub use method::Method;

mod version;
pub use version::Protocol;

mod headers;
pub use headers::Headers;

mod query;
pub use query::Query;

mod request;
pub use request::Encoding;
pub use request::Request;

mod cookie;
pub use cookie::Cookie;
pub use cookie::CookieBuilder;
pub use cookie::SameSite;

mod response;
pub use response::BoxError;
pub use response::ContentEncoding;
pub use response::Response;
pub use response::ResponseBody;

mod error;
pub use error::BodyError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
