//! SIP message types used by the signaling core
//!
//! Provides a typed representation of the parts of a SIP message the
//! transaction and dialog layers care about, together with RFC 3261 text
//! printing and parsing.
//!
//! Notable types are
//!
//! - [`Request`] and [`Response`], wrapped by [`Message`]
//! - [`Headers`] the typed headers every message carries
//! - [`Method`] and [`StatusCode`]
//! - [`SipUri`](uri::SipUri) and [`NameAddr`](uri::NameAddr)

mod code;
mod error;
pub mod header;
mod method;
pub mod msg;
mod parse;
pub mod uri;

pub use code::{CodeKind, StatusCode};
pub use error::ParseError;
pub use header::Headers;
pub use method::Method;
pub use msg::{Message, Request, Response};
