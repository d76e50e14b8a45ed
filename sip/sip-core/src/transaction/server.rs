use crate::config::SipConfig;
use crate::timer::{Timer, TimerExpired, TimerOwner, TimerSlot, Timers, is_current};
use crate::transport::{Destination, Outgoing};
use crate::{Error, Result};
use bytesstr::BytesStr;
use sip_types::{CodeKind, Method, Request, Response, StatusCode};
use std::net::SocketAddr;
use std::time::Duration;

/// Result of a timer expiry inside a [`ServerTransaction`]
#[derive(Debug)]
pub enum ServerTimer {
    Retransmit(Outgoing),
    /// The 2xx was never acknowledged
    AckTimeout,
    Stale,
}

/// Final response kept to answer retransmissions of the request
#[derive(Debug)]
pub(crate) struct Answered {
    branch: Option<BytesStr>,
    method: Method,
    response: Outgoing,
}

impl Answered {
    /// The response to re-send if `request` repeats the answered request
    pub(crate) fn repeat(&self, request: &Request) -> Option<&Outgoing> {
        let same = request.headers.branch().is_some()
            && request.headers.branch() == self.branch.as_ref()
            && request.line.method == self.method;

        same.then_some(&self.response)
    }
}

/// Server side of the transaction layer
///
/// Holds at most one request. An INVITE may be answered with a single
/// provisional response followed by one final response; any final
/// response releases the request.
#[derive(Debug)]
pub struct ServerTransaction {
    owner: TimerOwner,

    request: Option<(Request, SocketAddr)>,
    provisional: Option<Outgoing>,
    answered: Option<Answered>,

    /// 2xx to an INVITE waiting for the ACK
    awaiting_ack: Option<Outgoing>,
    retransmit: Option<Timer>,
    retransmit_interval: Duration,
    ack_timeout: Option<Timer>,
}

impl ServerTransaction {
    pub(crate) fn new(owner: TimerOwner) -> Self {
        Self {
            owner,
            request: None,
            provisional: None,
            answered: None,
            awaiting_ack: None,
            retransmit: None,
            retransmit_interval: Duration::ZERO,
            ack_timeout: None,
        }
    }

    /// Take over a received request, fails if one is already held
    pub(crate) fn receive_request(&mut self, request: Request, source: SocketAddr) -> Result<()> {
        if let Some((held, _)) = &self.request {
            return Err(Error::TransactionBusy(held.line.method.clone()));
        }

        self.request = Some((request, source));
        self.provisional = None;

        Ok(())
    }

    /// The request waiting for its final response
    pub fn held(&self) -> Option<&Request> {
        self.request.as_ref().map(|(request, _)| request)
    }

    pub fn is_awaiting_ack(&self) -> bool {
        self.awaiting_ack.is_some()
    }

    /// Create a response to the held request, to be passed to [`respond`](Self::respond)
    pub fn create_response(&self, code: StatusCode) -> Option<Response> {
        let (request, _) = self.request.as_ref()?;

        Some(Response::new(code, request.headers.for_response()))
    }

    /// Send `response` for the held request
    ///
    /// Returns `None` if no request is held or if a second provisional
    /// response is attempted. A final response releases the request, a 2xx
    /// to an INVITE starts retransmitting until the ACK arrives.
    pub(crate) fn respond(
        &mut self,
        response: Response,
        timers: &mut Timers,
        config: &SipConfig,
    ) -> Option<Outgoing> {
        let Some((request, source)) = &self.request else {
            log::warn!("no request to respond to with {}", response.code());
            return None;
        };

        let outgoing = Outgoing::new(response.clone(), Destination::Address(*source));

        if response.code().kind() == CodeKind::Provisional {
            if self.provisional.is_some() {
                log::warn!("refusing second provisional response {}", response.code());
                return None;
            }

            self.provisional = Some(outgoing.clone());
            return Some(outgoing);
        }

        let is_invite = request.line.method == Method::INVITE;

        self.answered = Some(Answered {
            branch: request.headers.branch().cloned(),
            method: request.line.method.clone(),
            response: outgoing.clone(),
        });

        self.request = None;
        self.provisional = None;

        if is_invite && response.code().kind() == CodeKind::Success {
            self.awaiting_ack = Some(outgoing.clone());

            self.ack_timeout = Some(timers.start(
                self.owner.target(TimerSlot::ServerTimeout),
                config.timers.request_timeout,
            ));

            if config.retransmit {
                self.retransmit_interval = config.timers.t1;
                self.retransmit = Some(timers.start(
                    self.owner.target(TimerSlot::ServerRetransmit),
                    self.retransmit_interval,
                ));
            }
        }

        Some(outgoing)
    }

    /// Check a CANCEL against the held INVITE
    ///
    /// Via branch, Call-ID, CSeq number, From and To must be the same.
    /// The To tag of the INVITE was set by us, so the CANCEL is allowed to
    /// lack it.
    pub fn matches_cancel(&self, cancel: &Request) -> bool {
        let Some((invite, _)) = &self.request else {
            return false;
        };

        if invite.line.method != Method::INVITE {
            return false;
        }

        let (i, c) = (&invite.headers, &cancel.headers);

        c.branch().is_some()
            && i.branch() == c.branch()
            && i.call_id == c.call_id
            && i.cseq.cseq == c.cseq.cseq
            && i.from.tag == c.from.tag
            && i.from.uri.uri.compare(&c.from.uri.uri)
            && i.to.uri.uri.compare(&c.to.uri.uri)
            && (c.to.tag.is_none() || c.to.tag == i.to.tag)
    }

    /// The ACK for our 2xx arrived, stops retransmitting
    pub(crate) fn receive_ack(&mut self) -> bool {
        self.retransmit = None;
        self.ack_timeout = None;
        self.awaiting_ack.take().is_some()
    }

    /// Returns the response to re-send if `request` repeats the held or last
    /// answered request. Returns `Some(None)` for a repeat that has not been
    /// answered yet.
    pub fn retransmission(&self, request: &Request) -> Option<Option<Outgoing>> {
        let branch = request.headers.branch()?;
        let method = &request.line.method;

        if let Some((held, _)) = &self.request {
            if held.headers.branch() == Some(branch) && held.line.method == *method {
                return Some(self.provisional.clone());
            }
        }

        self.answered
            .as_ref()
            .and_then(|answered| answered.repeat(request))
            .map(|response| Some(response.clone()))
    }

    /// Give up the last final response, kept by the manager after the
    /// dialog is gone
    pub(crate) fn take_answered(&mut self) -> Option<Answered> {
        self.answered.take()
    }

    pub(crate) fn on_timer(
        &mut self,
        expired: &TimerExpired,
        timers: &mut Timers,
        config: &SipConfig,
    ) -> ServerTimer {
        match expired.target.slot {
            TimerSlot::ServerRetransmit if is_current(&self.retransmit, expired) => {
                let Some(response) = self.awaiting_ack.clone() else {
                    return ServerTimer::Stale;
                };

                self.retransmit_interval = (self.retransmit_interval * 2).min(config.timers.t2);
                self.retransmit = Some(timers.start(
                    self.owner.target(TimerSlot::ServerRetransmit),
                    self.retransmit_interval,
                ));

                ServerTimer::Retransmit(response)
            }
            TimerSlot::ServerTimeout if is_current(&self.ack_timeout, expired) => {
                self.retransmit = None;
                self.ack_timeout = None;
                self.awaiting_ack = None;

                ServerTimer::AckTimeout
            }
            _ => ServerTimer::Stale,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::session::SessionId;
    use sip_types::header::typed::{CSeq, CallID, FromTo, Via};
    use sip_types::uri::NameAddr;
    use sip_types::Message;
    use tokio::sync::mpsc;

    fn invite() -> Request {
        let mut headers = sip_types::Headers::new(
            FromTo::new(NameAddr::uri("sip:alice@a".parse().unwrap()), Some("a".into())),
            FromTo::new(NameAddr::uri("sip:bob@b".parse().unwrap()), Some("b".into())),
            CallID::new("call"),
            CSeq::new(1, Method::INVITE),
        );
        headers.via.push(Via::new("UDP", "a", None, "z9hG4bKinv"));

        Request::new(Method::INVITE, "sip:bob@b".parse().unwrap(), headers)
    }

    fn cancel_for(invite: &Request) -> Request {
        let mut headers = invite.headers.clone();
        headers.to.tag = None;
        headers.cseq.method = Method::CANCEL;

        Request::new(Method::CANCEL, invite.line.uri.clone(), headers)
    }

    fn source() -> SocketAddr {
        "10.0.0.1:5060".parse().unwrap()
    }

    fn setup() -> (ServerTransaction, Timers, mpsc::UnboundedReceiver<TimerExpired>) {
        let (tx, rx) = mpsc::unbounded_channel();

        (
            ServerTransaction::new(TimerOwner::Session(SessionId::new(1))),
            Timers::new(tx),
            rx,
        )
    }

    fn code(outgoing: &Outgoing) -> StatusCode {
        match &outgoing.message {
            Message::Response(response) => response.code(),
            Message::Request(_) => panic!("expected response"),
        }
    }

    #[tokio::test]
    async fn one_provisional_one_final() {
        let (mut server, mut timers, _rx) = setup();
        let config = SipConfig::default();

        server.receive_request(invite(), source()).unwrap();
        assert!(matches!(
            server.receive_request(invite(), source()),
            Err(Error::TransactionBusy(Method::INVITE))
        ));

        let ringing = server.create_response(StatusCode::RINGING).unwrap();
        let sent = server.respond(ringing.clone(), &mut timers, &config).unwrap();
        assert_eq!(sent.destination, Destination::Address(source()));
        assert!(server.respond(ringing, &mut timers, &config).is_none());

        let decline = server.create_response(StatusCode::DECLINE).unwrap();
        assert!(server.respond(decline.clone(), &mut timers, &config).is_some());

        // the request is released, a second final response is impossible
        assert!(server.held().is_none());
        assert!(server.respond(decline, &mut timers, &config).is_none());
        assert!(!server.is_awaiting_ack());
    }

    #[test]
    fn cancel_cross_check() {
        let mut server = ServerTransaction::new(TimerOwner::Session(SessionId::new(1)));

        let invite = invite();
        server.receive_request(invite.clone(), source()).unwrap();

        assert!(server.matches_cancel(&cancel_for(&invite)));

        let mut other_branch = cancel_for(&invite);
        other_branch.headers.via[0] = Via::new("UDP", "a", None, "z9hG4bKother");
        assert!(!server.matches_cancel(&other_branch));

        let mut other_cseq = cancel_for(&invite);
        other_cseq.headers.cseq.cseq = 2;
        assert!(!server.matches_cancel(&other_cseq));

        let mut other_call = cancel_for(&invite);
        other_call.headers.call_id = CallID::new("other");
        assert!(!server.matches_cancel(&other_call));

        let mut other_from = cancel_for(&invite);
        other_from.headers.from.tag = Some("x".into());
        assert!(!server.matches_cancel(&other_from));

        let mut other_to = cancel_for(&invite);
        other_to.headers.to.uri = NameAddr::uri("sip:carol@b".parse().unwrap());
        assert!(!server.matches_cancel(&other_to));
    }

    #[tokio::test]
    async fn retransmitted_request() {
        let (mut server, mut timers, _rx) = setup();
        let config = SipConfig::default();
        let invite = invite();

        server.receive_request(invite.clone(), source()).unwrap();
        assert!(matches!(server.retransmission(&invite), Some(None)));

        let trying = server.create_response(StatusCode::TRYING).unwrap();
        server.respond(trying, &mut timers, &config);
        assert!(matches!(server.retransmission(&invite), Some(Some(ref o)) if code(o) == StatusCode::TRYING));

        let busy = server.create_response(StatusCode::BUSY_HERE).unwrap();
        server.respond(busy, &mut timers, &config);
        assert!(matches!(server.retransmission(&invite), Some(Some(ref o)) if code(o) == StatusCode::BUSY_HERE));

        // CANCEL shares the branch but is a different transaction
        assert!(server.retransmission(&cancel_for(&invite)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn ok_retransmitted_until_ack() {
        let (mut server, mut timers, mut rx) = setup();
        let config = SipConfig::default();

        server.receive_request(invite(), source()).unwrap();
        let ok = server.create_response(StatusCode::OK).unwrap();
        server.respond(ok, &mut timers, &config).unwrap();
        assert!(server.is_awaiting_ack());

        let mut retransmits = 0;
        for _ in 0..3 {
            let expired = rx.recv().await.unwrap();
            let timer = server.on_timer(&expired, &mut timers, &config);

            if let ServerTimer::Retransmit(outgoing) = timer {
                assert_eq!(code(&outgoing), StatusCode::OK);
                retransmits += 1;
            }
        }
        assert_eq!(retransmits, 3);

        assert!(server.receive_ack());
        assert!(!server.receive_ack());
    }

    #[tokio::test(start_paused = true)]
    async fn ok_without_ack_times_out() {
        let (mut server, mut timers, mut rx) = setup();
        let config = SipConfig::default();

        server.receive_request(invite(), source()).unwrap();
        let ok = server.create_response(StatusCode::OK).unwrap();
        server.respond(ok, &mut timers, &config).unwrap();

        loop {
            let expired = rx.recv().await.unwrap();

            match server.on_timer(&expired, &mut timers, &config) {
                ServerTimer::Retransmit(_) | ServerTimer::Stale => {}
                ServerTimer::AckTimeout => break,
            }
        }

        assert!(!server.is_awaiting_ack());
    }
}
