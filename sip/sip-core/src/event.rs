use crate::session::SessionId;
use bytes::Bytes;
use sip_types::StatusCode;
use sip_types::uri::{NameAddr, SipUri};

/// Notifications for call control
///
/// Sent through an unbounded channel in the order the underlying messages
/// and timers were processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SipEvent {
    /// We started calling `callee`
    OutgoingCall { session: SessionId, callee: SipUri },
    /// Someone is calling, answer with
    /// [`accept_call`](crate::Transactions::accept_call) or
    /// [`reject_call`](crate::Transactions::reject_call) unless auto accept
    /// is enabled
    IncomingCall { session: SessionId, caller: NameAddr },
    CallRinging { session: SessionId },
    /// The callee answered our INVITE with a 2xx
    PeerAccepted { session: SessionId },
    /// The callee declined or never answered, `code` is `None` on timeout
    PeerRejected {
        session: SessionId,
        code: Option<StatusCode>,
    },
    /// Offer and answer were exchanged and the call is confirmed
    CallNegotiated {
        session: SessionId,
        local: Bytes,
        remote: Bytes,
    },
    CallNegotiationFailed { session: SessionId },
    /// The caller gave up before we answered
    CancelIncomingCall { session: SessionId },
    EndCall { session: SessionId },
    RegisteredToServer { registrar: SipUri },
    RegisteringFailed {
        registrar: SipUri,
        code: Option<StatusCode>,
    },
}

impl SipEvent {
    /// Session the event belongs to, `None` for registration events
    pub fn session(&self) -> Option<SessionId> {
        match self {
            SipEvent::OutgoingCall { session, .. }
            | SipEvent::IncomingCall { session, .. }
            | SipEvent::CallRinging { session }
            | SipEvent::PeerAccepted { session }
            | SipEvent::PeerRejected { session, .. }
            | SipEvent::CallNegotiated { session, .. }
            | SipEvent::CallNegotiationFailed { session }
            | SipEvent::CancelIncomingCall { session }
            | SipEvent::EndCall { session } => Some(*session),
            SipEvent::RegisteredToServer { .. } | SipEvent::RegisteringFailed { .. } => None,
        }
    }
}
