//! Header names, typed headers and the [`Headers`] container

use crate::error::ParseError;
use crate::parse::split_comma;
use bytesstr::BytesStr;
use nom::IResult;
use std::fmt;

mod name;
pub mod typed;

pub use name::Name;
use typed::{CSeq, CallID, Contact, ContentType, FromTo, Route, Via};

/// Parse a single header value into a typed header
pub(crate) trait HeaderParse: Sized {
    fn parse(i: &str) -> IResult<&str, Self>;
}

/// Parse the complete `value` as `H`, trailing whitespace is allowed
fn parse_value<H: HeaderParse>(name: Name, value: &str) -> Result<H, ParseError> {
    match H::parse(value.trim()) {
        Ok((rem, header)) if rem.trim().is_empty() => Ok(header),
        _ => Err(ParseError::header(name, value)),
    }
}

fn parse_number<N: std::str::FromStr>(name: Name, value: &str) -> Result<N, ParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| ParseError::header(name, value))
}

/// The typed headers of a SIP message
///
/// Mandatory headers are plain fields, everything else is optional.
/// `Content-Length` is not stored, it is derived from the body when printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    pub via: Vec<Via>,
    pub max_forwards: Option<u32>,
    pub from: FromTo,
    pub to: FromTo,
    pub call_id: CallID,
    pub cseq: CSeq,
    pub contact: Option<Contact>,
    pub route: Vec<Route>,
    pub record_route: Vec<Route>,
    pub content_type: Option<ContentType>,
    pub expires: Option<u32>,
    pub user_agent: Option<BytesStr>,
}

impl Headers {
    pub fn new(from: FromTo, to: FromTo, call_id: CallID, cseq: CSeq) -> Self {
        Self {
            via: Vec::new(),
            max_forwards: None,
            from,
            to,
            call_id,
            cseq,
            contact: None,
            route: Vec::new(),
            record_route: Vec::new(),
            content_type: None,
            expires: None,
            user_agent: None,
        }
    }

    /// The topmost `Via`, added by the last hop
    pub fn top_via(&self) -> Option<&Via> {
        self.via.first()
    }

    /// Branch of the topmost `Via`, identifies the transaction
    pub fn branch(&self) -> Option<&BytesStr> {
        self.top_via().and_then(Via::branch)
    }

    /// Copy the headers a response to a request with these headers must carry
    pub fn for_response(&self) -> Self {
        Self {
            via: self.via.clone(),
            max_forwards: None,
            from: self.from.clone(),
            to: self.to.clone(),
            call_id: self.call_id.clone(),
            cseq: self.cseq.clone(),
            contact: None,
            route: Vec::new(),
            record_route: self.record_route.clone(),
            content_type: None,
            expires: None,
            user_agent: None,
        }
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for via in &self.via {
            write!(f, "{}: {}\r\n", Name::Via, via)?;
        }

        if let Some(max_forwards) = self.max_forwards {
            write!(f, "{}: {}\r\n", Name::MaxForwards, max_forwards)?;
        }

        for route in &self.route {
            write!(f, "{}: {}\r\n", Name::Route, route)?;
        }

        for route in &self.record_route {
            write!(f, "{}: {}\r\n", Name::RecordRoute, route)?;
        }

        write!(f, "{}: {}\r\n", Name::From, self.from)?;
        write!(f, "{}: {}\r\n", Name::To, self.to)?;
        write!(f, "{}: {}\r\n", Name::CallId, self.call_id)?;
        write!(f, "{}: {}\r\n", Name::CSeq, self.cseq)?;

        if let Some(contact) = &self.contact {
            write!(f, "{}: {}\r\n", Name::Contact, contact)?;
        }

        if let Some(expires) = self.expires {
            write!(f, "{}: {}\r\n", Name::Expires, expires)?;
        }

        if let Some(user_agent) = &self.user_agent {
            write!(f, "{}: {}\r\n", Name::UserAgent, user_agent)?;
        }

        if let Some(content_type) = &self.content_type {
            write!(f, "{}: {}\r\n", Name::ContentType, content_type)?;
        }

        Ok(())
    }
}

/// Collects header lines while parsing a message
#[derive(Default)]
pub(crate) struct HeadersBuilder {
    via: Vec<Via>,
    max_forwards: Option<u32>,
    from: Option<FromTo>,
    to: Option<FromTo>,
    call_id: Option<CallID>,
    cseq: Option<CSeq>,
    contact: Option<Contact>,
    route: Vec<Route>,
    record_route: Vec<Route>,
    content_type: Option<ContentType>,
    expires: Option<u32>,
    user_agent: Option<BytesStr>,
    pub(crate) content_length: Option<usize>,
}

impl HeadersBuilder {
    /// Insert a single (unfolded) header line, unknown headers are ignored
    pub(crate) fn insert(&mut self, name: &str, value: &str) -> Result<(), ParseError> {
        let Some(name) = Name::lookup(name.trim()) else {
            return Ok(());
        };

        match name {
            Name::Via => {
                for value in split_comma(value) {
                    self.via.push(parse_value(name, value)?);
                }
            }
            Name::MaxForwards => self.max_forwards = Some(parse_number(name, value)?),
            Name::From => self.from = Some(parse_value(name, value)?),
            Name::To => self.to = Some(parse_value(name, value)?),
            Name::CallId => self.call_id = Some(parse_value(name, value)?),
            Name::CSeq => self.cseq = Some(parse_value(name, value)?),
            // `*` is only valid in REGISTER and carries no binding
            Name::Contact if self.contact.is_some() || value.trim() == "*" => {}
            Name::Contact => {
                if let Some(first) = split_comma(value).first() {
                    self.contact = Some(parse_value(name, first)?);
                }
            }
            Name::Route => {
                for value in split_comma(value) {
                    self.route.push(parse_value(name, value)?);
                }
            }
            Name::RecordRoute => {
                for value in split_comma(value) {
                    self.record_route.push(parse_value(name, value)?);
                }
            }
            Name::ContentType => self.content_type = Some(parse_value(name, value)?),
            Name::ContentLength => self.content_length = Some(parse_number(name, value)?),
            Name::Expires => self.expires = Some(parse_number(name, value)?),
            Name::UserAgent => self.user_agent = Some(BytesStr::from(value.trim())),
        }

        Ok(())
    }

    pub(crate) fn finish(self) -> Result<Headers, ParseError> {
        if self.via.is_empty() {
            return Err(ParseError::Missing(Name::Via));
        }

        Ok(Headers {
            via: self.via,
            max_forwards: self.max_forwards,
            from: self.from.ok_or(ParseError::Missing(Name::From))?,
            to: self.to.ok_or(ParseError::Missing(Name::To))?,
            call_id: self.call_id.ok_or(ParseError::Missing(Name::CallId))?,
            cseq: self.cseq.ok_or(ParseError::Missing(Name::CSeq))?,
            contact: self.contact,
            route: self.route,
            record_route: self.record_route,
            content_type: self.content_type,
            expires: self.expires,
            user_agent: self.user_agent,
        })
    }
}
