//! Everything that touches the socket.
//!
//! - [`BufferedClient`]: socket halves with a read deadline and a pushback slot
//! - [`BodyReader`] and [`RequestBody`]: request body framing and the handle
//!   a router reads the body through
//! - [`ResponseSerializer`]: response rendering with adaptive buffering
//! - [`ConnectionSuit`]: the request/response loop composing all of the above

mod body_reader;
mod client;
mod serializer;
mod suit;

pub use body_reader::BodyReader;
pub use body_reader::RequestBody;
pub use client::BufferedClient;
pub use serializer::ResponseSerializer;
pub use suit::ConnectionSuit;
pub use suit::HijackedConnection;
pub use suit::Outcome;
