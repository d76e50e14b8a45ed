//! Request, response and the message codec

use crate::code::StatusCode;
use crate::error::ParseError;
use crate::header::{Headers, HeadersBuilder, Name};
use crate::method::Method;
use crate::uri::SipUri;
use bytes::{BufMut, Bytes, BytesMut};
use bytesstr::BytesStr;
use memchr::memmem;
use std::fmt;
use std::str::from_utf8;

const SIP_VERSION: &str = "SIP/2.0";

/// `Method SP Request-URI SP SIP-Version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub uri: SipUri,
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {SIP_VERSION}", self.method, self.uri)
    }
}

/// `SIP-Version SP Status-Code SP Reason-Phrase`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub code: StatusCode,
    pub reason: Option<BytesStr>,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match &self.reason {
            Some(reason) => reason.as_str(),
            None => self.code.text().unwrap_or_default(),
        };

        write!(f, "{SIP_VERSION} {} {reason}", self.code.into_u16())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub line: RequestLine,
    pub headers: Headers,
    pub body: Bytes,
}

impl Request {
    pub fn new(method: Method, uri: SipUri, headers: Headers) -> Self {
        Self {
            line: RequestLine { method, uri },
            headers,
            body: Bytes::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.line.method
    }

    pub fn to_bytes(&self) -> Bytes {
        print_message(&self.line, &self.headers, &self.body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub line: StatusLine,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    pub fn new(code: StatusCode, headers: Headers) -> Self {
        Self {
            line: StatusLine { code, reason: None },
            headers,
            body: Bytes::new(),
        }
    }

    pub fn code(&self) -> StatusCode {
        self.line.code
    }

    pub fn to_bytes(&self) -> Bytes {
        print_message(&self.line, &self.headers, &self.body)
    }
}

/// Either a [`Request`] or a [`Response`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn headers(&self) -> &Headers {
        match self {
            Message::Request(request) => &request.headers,
            Message::Response(response) => &response.headers,
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        match self {
            Message::Request(request) => request.to_bytes(),
            Message::Response(response) => response.to_bytes(),
        }
    }

    /// Parse a complete message from a datagram
    ///
    /// Folded header lines are joined, unknown headers are skipped. If a
    /// `Content-Length` is present the body is cut to that length, otherwise
    /// everything after the header section is the body.
    ///
    /// ```
    /// use vcall_sip_types::{Message, Method};
    ///
    /// let msg = Message::parse(
    ///     b"BYE sip:bob@10.0.0.2 SIP/2.0\r\n\
    ///     Via: SIP/2.0/UDP 10.0.0.1;branch=z9hG4bK1\r\n\
    ///     From: <sip:alice@10.0.0.1>;tag=a\r\n\
    ///     To: <sip:bob@10.0.0.2>;tag=b\r\n\
    ///     Call-ID: abc\r\n\
    ///     CSeq: 2 BYE\r\n\
    ///     Content-Length: 0\r\n\r\n",
    /// )
    /// .unwrap();
    ///
    /// let Message::Request(bye) = msg else { panic!() };
    /// assert_eq!(bye.method(), &Method::BYE);
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        let separator = memmem::find(bytes, b"\r\n\r\n").ok_or(ParseError::Incomplete)?;

        let head = from_utf8(&bytes[..separator]).map_err(|_| ParseError::NotUtf8)?;
        let body = &bytes[separator + 4..];

        let mut lines = unfold(head).into_iter();
        let start_line = lines.next().ok_or(ParseError::Incomplete)?;

        let mut builder = HeadersBuilder::default();

        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::StartLine(line.clone()))?;

            builder.insert(name, value)?;
        }

        let body = match builder.content_length {
            Some(expected) if expected > body.len() => {
                return Err(ParseError::Truncated {
                    expected,
                    got: body.len(),
                });
            }
            Some(len) => Bytes::copy_from_slice(&body[..len]),
            None => Bytes::copy_from_slice(body),
        };

        let headers = builder.finish()?;

        if let Some(line) = start_line.strip_prefix(SIP_VERSION) {
            let line = parse_status_line(line).ok_or_else(|| ParseError::StartLine(start_line.clone()))?;

            Ok(Message::Response(Response {
                line,
                headers,
                body,
            }))
        } else {
            let line = parse_request_line(&start_line)?;

            Ok(Message::Request(Request {
                line,
                headers,
                body,
            }))
        }
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Message::Request(request)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}

fn print_message(line: &dyn fmt::Display, headers: &Headers, body: &Bytes) -> Bytes {
    let head = format!(
        "{line}\r\n{headers}{}: {}\r\n\r\n",
        Name::ContentLength,
        body.len()
    );

    let mut buf = BytesMut::with_capacity(head.len() + body.len());
    buf.put_slice(head.as_bytes());
    buf.put_slice(body);
    buf.freeze()
}

/// Split the header section into lines, joining continuation lines
fn unfold(head: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for line in head.split("\r\n") {
        match lines.last_mut() {
            Some(last) if line.starts_with([' ', '\t']) => {
                last.push(' ');
                last.push_str(line.trim_start());
            }
            _ if line.is_empty() => {}
            _ => lines.push(line.to_owned()),
        }
    }

    lines
}

fn parse_status_line(line: &str) -> Option<StatusLine> {
    let line = line.trim_start();
    let (code, reason) = line.split_once(' ').unwrap_or((line, ""));

    let code: u16 = code.parse().ok()?;
    if !(100..=699).contains(&code) {
        return None;
    }

    let reason = reason.trim();

    Some(StatusLine {
        code: StatusCode::from(code),
        reason: (!reason.is_empty()).then(|| BytesStr::from(reason)),
    })
}

fn parse_request_line(line: &str) -> Result<RequestLine, ParseError> {
    let mut parts = line.split_whitespace();

    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(uri), Some(SIP_VERSION), None) => Ok(RequestLine {
            method: Method::from(method),
            uri: uri.parse()?,
        }),
        _ => Err(ParseError::StartLine(line.to_owned())),
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n{}", self.line, self.headers)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\r\n{}", self.line, self.headers)
    }
}
