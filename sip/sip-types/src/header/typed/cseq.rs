use crate::header::HeaderParse;
use crate::method::Method;
use crate::parse::{token, whitespace};
use nom::IResult;
use nom::bytes::complete::{take_while, take_while1};
use nom::character::complete::digit1;
use nom::combinator::{map, map_res};
use nom::sequence::separated_pair;
use std::fmt;
use std::str::FromStr;

/// `CSeq` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSeq {
    pub cseq: u32,
    pub method: Method,
}

impl CSeq {
    #[inline]
    pub const fn new(cseq: u32, method: Method) -> CSeq {
        CSeq { cseq, method }
    }
}

impl HeaderParse for CSeq {
    fn parse(i: &str) -> IResult<&str, Self> {
        map(
            separated_pair(
                map_res(digit1, u32::from_str),
                take_while(whitespace),
                take_while1(token),
            ),
            |(cseq, method)| CSeq {
                cseq,
                method: Method::from(method),
            },
        )(i)
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.cseq, self.method)
    }
}
