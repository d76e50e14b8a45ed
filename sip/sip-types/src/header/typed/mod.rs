//! Typed representations of the headers carried by every message

mod call_id;
mod cseq;
mod from_to;
mod routing;
mod via;

pub use call_id::CallID;
pub use cseq::CSeq;
pub use from_to::FromTo;
pub use routing::{Contact, Route};
pub use via::{MAGIC_COOKIE, Via};

use super::HeaderParse;
use bytesstr::BytesStr;
use nom::IResult;
use nom::bytes::complete::take_while1;
use nom::combinator::map;
use std::fmt;

/// `Content-Type` header, kept as plain media type text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType(pub BytesStr);

impl ContentType {
    pub fn sdp() -> Self {
        Self(BytesStr::from_static("application/sdp"))
    }
}

impl HeaderParse for ContentType {
    fn parse(i: &str) -> IResult<&str, Self> {
        map(take_while1(|c| c != '\r' && c != '\n'), |ct: &str| {
            Self(BytesStr::from(ct.trim()))
        })(i)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
