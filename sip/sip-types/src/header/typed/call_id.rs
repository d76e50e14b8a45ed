use crate::header::HeaderParse;
use bytesstr::BytesStr;
use nom::IResult;
use nom::bytes::complete::take_while1;
use nom::combinator::map;
use std::fmt;

/// `Call-ID` header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallID(pub BytesStr);

impl CallID {
    pub fn new(id: impl Into<BytesStr>) -> Self {
        Self(id.into())
    }
}

impl HeaderParse for CallID {
    fn parse(i: &str) -> IResult<&str, Self> {
        map(take_while1(|c: char| !c.is_whitespace()), |id: &str| {
            Self(BytesStr::from(id))
        })(i)
    }
}

impl fmt::Display for CallID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
