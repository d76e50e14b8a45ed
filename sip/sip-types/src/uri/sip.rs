use super::params::Params;
use crate::error::ParseError;
use crate::parse::{host_port, user_char};
use bytesstr::BytesStr;
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while1};
use nom::character::complete::char;
use nom::combinator::{map, opt};
use nom::sequence::{terminated, tuple};
use std::fmt;
use std::str::FromStr;

/// `sip:` or `sips:` uri
///
/// ```
/// use vcall_sip_types::uri::SipUri;
///
/// let uri: SipUri = "sip:alice@10.0.0.1:5060;transport=udp".parse().unwrap();
///
/// assert_eq!(uri.user.as_deref(), Some("alice"));
/// assert_eq!(uri.host_port(), "10.0.0.1:5060");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipUri {
    pub sips: bool,
    pub user: Option<BytesStr>,
    pub host: BytesStr,
    pub port: Option<u16>,
    pub params: Params,
}

impl SipUri {
    pub fn new(host: impl Into<BytesStr>) -> Self {
        Self {
            sips: false,
            user: None,
            host: host.into(),
            port: None,
            params: Params::new(),
        }
    }

    pub fn with_user(mut self, user: impl Into<BytesStr>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Create an uri from an `host[:port]` string
    pub fn from_host_port(host_port: &str) -> Result<Self, ParseError> {
        match self::host_port(host_port) {
            Ok(("", (host, port))) => Ok(Self {
                port,
                ..Self::new(host)
            }),
            _ => Err(ParseError::Uri(host_port.to_owned())),
        }
    }

    /// `host[:port]` part of the uri
    pub fn host_port(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.to_string(),
        }
    }

    /// Compare user, host and port, ignoring parameters
    pub fn compare(&self, other: &SipUri) -> bool {
        self.sips == other.sips
            && self.user == other.user
            && self.host.eq_ignore_ascii_case(&other.host)
            && self.port.unwrap_or(5060) == other.port.unwrap_or(5060)
    }

    /// Parse the uri without trailing parameters, used where parameters
    /// belong to the surrounding header instead.
    pub(crate) fn parse_no_params(i: &str) -> IResult<&str, Self> {
        map(
            tuple((
                alt((
                    map(tag_no_case("sips:"), |_| true),
                    map(tag_no_case("sip:"), |_| false),
                )),
                opt(terminated(take_while1(user_char), char('@'))),
                host_port,
            )),
            |(sips, user, (host, port))| SipUri {
                sips,
                user: user.map(BytesStr::from),
                host: BytesStr::from(host),
                port,
                params: Params::new(),
            },
        )(i)
    }

    pub(crate) fn parse(i: &str) -> IResult<&str, Self> {
        let (i, mut uri) = Self::parse_no_params(i)?;
        let (i, params) = Params::parse(i)?;
        uri.params = params;
        Ok((i, uri))
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sips {
            f.write_str("sips:")?;
        } else {
            f.write_str("sip:")?;
        }

        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }

        f.write_str(&self.host)?;

        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }

        self.params.fmt(f)
    }
}

impl FromStr for SipUri {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::parse(s.trim()) {
            Ok(("", uri)) => Ok(uri),
            _ => Err(ParseError::Uri(s.to_owned())),
        }
    }
}
