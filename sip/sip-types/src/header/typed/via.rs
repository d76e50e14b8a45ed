use crate::header::HeaderParse;
use crate::parse::{host_port, token, whitespace};
use crate::uri::{Param, Params};
use bytesstr::BytesStr;
use nom::IResult;
use nom::bytes::complete::{tag_no_case, take_while, take_while1};
use nom::combinator::map;
use nom::sequence::tuple;
use std::fmt;

/// Prefix every RFC 3261 compliant branch must start with
pub const MAGIC_COOKIE: &str = "z9hG4bK";

/// `Via` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Via {
    pub transport: BytesStr,
    pub host: BytesStr,
    pub port: Option<u16>,
    pub params: Params,
}

impl Via {
    pub fn new(
        transport: impl Into<BytesStr>,
        host: impl Into<BytesStr>,
        port: Option<u16>,
        branch: impl Into<BytesStr>,
    ) -> Self {
        Self {
            transport: transport.into(),
            host: host.into(),
            port,
            params: Params::new().with(Param::value("branch", branch)),
        }
    }

    pub fn branch(&self) -> Option<&BytesStr> {
        self.params.get_val("branch")
    }

    /// `host[:port]` the sender expects responses at
    pub fn sent_by(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.to_string(),
        }
    }
}

impl HeaderParse for Via {
    fn parse(i: &str) -> IResult<&str, Self> {
        map(
            tuple((
                tag_no_case("SIP/2.0/"),
                take_while1(token),
                take_while(whitespace),
                host_port,
                Params::parse,
            )),
            |(_, transport, _, (host, port), params)| Self {
                transport: BytesStr::from(transport),
                host: BytesStr::from(host),
                port,
                params,
            },
        )(i)
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIP/2.0/{} {}{}", self.transport, self.sent_by(), self.params)
    }
}
