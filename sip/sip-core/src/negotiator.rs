use crate::session::SessionId;
use bytes::Bytes;

/// Produces and consumes the session descriptions carried in INVITE and
/// its 2xx response
///
/// Descriptions are opaque to the signaling core, they are sent as
/// `application/sdp` bodies.
pub trait Negotiator: Send + 'static {
    /// Offer for an outgoing INVITE
    fn create_offer(&mut self, session: SessionId) -> Bytes;

    /// Answer an offer received in an INVITE, `None` rejects the call with
    /// `488 Not Acceptable Here`
    fn receive_offer(&mut self, session: SessionId, offer: &Bytes) -> Option<Bytes>;

    /// Returns false if the answer to our offer is unusable
    fn receive_answer(&mut self, session: SessionId, answer: &Bytes) -> bool;

    /// The session was removed, release everything kept for it
    fn session_ended(&mut self, session: SessionId) {
        let _ = session;
    }
}

/// Negotiator exchanging empty bodies, every call succeeds
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNegotiation;

impl Negotiator for NoNegotiation {
    fn create_offer(&mut self, _: SessionId) -> Bytes {
        Bytes::new()
    }

    fn receive_offer(&mut self, _: SessionId, _: &Bytes) -> Option<Bytes> {
        Some(Bytes::new())
    }

    fn receive_answer(&mut self, _: SessionId, _: &Bytes) -> bool {
        true
    }
}
