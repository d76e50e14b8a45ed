use super::params::Params;
use super::sip::SipUri;
use crate::error::ParseError;
use crate::parse::{quoted, whitespace};
use bytesstr::BytesStr;
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::combinator::{map, opt};
use nom::sequence::{delimited, pair, tuple};
use std::fmt;
use std::str::FromStr;

/// An uri with an optional display name
/// `(token|"display") <URI> | URI`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAddr {
    pub name: Option<BytesStr>,
    pub uri: SipUri,
}

impl NameAddr {
    pub fn new(name: impl Into<BytesStr>, uri: SipUri) -> Self {
        Self {
            name: Some(name.into()),
            uri,
        }
    }

    pub fn uri(uri: SipUri) -> Self {
        Self { name: None, uri }
    }

    /// Parse a name-addr followed by header parameters.
    ///
    /// Parameters inside the angle brackets belong to the uri, parameters
    /// after it (or after a bare uri) belong to the header.
    pub(crate) fn parse_with_params(i: &str) -> IResult<&str, (Self, Params)> {
        pair(
            alt((
                map(
                    tuple((
                        opt(alt((quoted, take_while1(display)))),
                        take_while(whitespace),
                        delimited(tag("<"), SipUri::parse, tag(">")),
                    )),
                    |(name, _, uri)| Self {
                        name: name
                            .map(str::trim)
                            .filter(|name| !name.is_empty())
                            .map(BytesStr::from),
                        uri,
                    },
                ),
                map(SipUri::parse_no_params, NameAddr::uri),
            )),
            Params::parse,
        )(i)
    }
}

impl fmt::Display for NameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "\"{name}\" ")?;
        }

        write!(f, "<{}>", self.uri)
    }
}

impl FromStr for NameAddr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::parse_with_params(s.trim()) {
            Ok(("", (name_addr, params))) if params.is_empty() => Ok(name_addr),
            _ => Err(ParseError::Uri(s.to_owned())),
        }
    }
}

fn display(c: char) -> bool {
    !matches!(c, ':' | '\r' | '\n' | '<')
}
