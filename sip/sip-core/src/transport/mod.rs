//! Addressing of outgoing messages and the UDP transport

use crate::{Error, Result};
use sip_types::Message;
use sip_types::uri::SipUri;
use std::fmt;
use std::net::SocketAddr;

mod udp;

pub use udp::{ReceivedMessage, Udp};

const DEFAULT_PORT: u16 = 5060;

/// Where an outgoing message is sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Responses go back to the source of the request
    Address(SocketAddr),
    /// Requests go to the remote target, resolved before sending
    Uri(SipUri),
}

impl Destination {
    pub async fn resolve(&self) -> Result<SocketAddr> {
        match self {
            Destination::Address(addr) => Ok(*addr),
            Destination::Uri(uri) => {
                let host_port = format!("{}:{}", uri.host, uri.port.unwrap_or(DEFAULT_PORT));

                let addr = tokio::net::lookup_host(&host_port).await?.next();

                addr.ok_or(Error::Resolve(host_port))
            }
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Address(addr) => addr.fmt(f),
            Destination::Uri(uri) => uri.fmt(f),
        }
    }
}

/// A message produced by the state machine, waiting to be sent
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub message: Message,
    pub destination: Destination,
}

impl Outgoing {
    pub fn new(message: impl Into<Message>, destination: Destination) -> Self {
        Self {
            message: message.into(),
            destination,
        }
    }
}
