use crate::session::SessionId;
use sip_types::{Method, ParseError};
use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("no dialog for session {0}")]
    UnknownSession(SessionId),
    #[error("a {0} transaction is still outstanding")]
    TransactionBusy(Method),
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("failed to resolve {0}")]
    Resolve(String),
    #[error("endpoint is no longer running")]
    EndpointClosed,
}

/// Error creating a dialog from an incoming INVITE
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("INVITE has no From tag")]
    MissingFromTag,
    #[error("expected INVITE, got {0}")]
    NotInvite(Method),
}
