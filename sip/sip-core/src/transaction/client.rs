use crate::config::SipConfig;
use crate::timer::{Timer, TimerExpired, TimerOwner, TimerSlot, Timers, is_current};
use crate::{Error, Result};
use sip_types::header::typed::CSeq;
use sip_types::{CodeKind, Method, Request, Response, StatusCode};
use std::time::Duration;

/// Result of feeding a response into a [`ClientTransaction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientOutcome {
    /// 1xx, the request is still pending
    Provisional { ringing: bool },
    /// 2xx to the outstanding request
    Success(Method),
    /// 6xx to an INVITE
    Rejected(StatusCode),
    /// Any other final response
    Failure(Method, StatusCode),
    /// Another 2xx to an INVITE that was already answered
    RetransmittedSuccess,
    /// Not meant for the outstanding request, e.g. the 200 to a CANCEL
    Ignored,
}

/// Result of a timer expiry inside a [`ClientTransaction`]
#[derive(Debug)]
pub enum ClientTimer {
    Retransmit(Request),
    /// No final response in time, carries a CANCEL if the request was an INVITE
    TimedOut {
        method: Method,
        cancel: Option<Request>,
    },
    Stale,
}

/// Client side of the transaction layer
///
/// Only one request may be outstanding at a time. ACK and CANCEL are sent
/// without a transaction of their own.
#[derive(Debug)]
pub struct ClientTransaction {
    owner: TimerOwner,

    ongoing: Option<Method>,
    /// Latest request sent through [`start_transaction`](Self::start_transaction)
    request: Option<Request>,
    /// Latest ACK, re-sent when the peer repeats its 2xx
    ack: Option<Request>,

    timeout: Option<Timer>,
    retransmit: Option<Timer>,
    retransmit_interval: Duration,
}

impl ClientTransaction {
    pub(crate) fn new(owner: TimerOwner) -> Self {
        Self {
            owner,
            ongoing: None,
            request: None,
            ack: None,
            timeout: None,
            retransmit: None,
            retransmit_interval: Duration::ZERO,
        }
    }

    /// Method of the outstanding request
    pub fn ongoing(&self) -> Option<&Method> {
        self.ongoing.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.ongoing.is_some()
    }

    /// Record `request` as sent and start its timers
    ///
    /// Fails if another request is still outstanding. ACK and CANCEL do not
    /// occupy the transaction and never start a timer.
    pub(crate) fn start_transaction(
        &mut self,
        request: &Request,
        timers: &mut Timers,
        config: &SipConfig,
    ) -> Result<()> {
        let method = request.method();

        if *method == Method::ACK {
            self.ack = Some(request.clone());
            return Ok(());
        }

        if *method == Method::CANCEL {
            return Ok(());
        }

        if let Some(ongoing) = &self.ongoing {
            return Err(Error::TransactionBusy(ongoing.clone()));
        }

        log::debug!("starting {method} client transaction");

        self.ongoing = Some(method.clone());
        self.request = Some(request.clone());

        self.timeout = Some(timers.start(
            self.owner.target(TimerSlot::ClientTimeout),
            config.timers.request_timeout,
        ));

        if config.retransmit {
            self.retransmit_interval = config.timers.t1;
            self.retransmit = Some(timers.start(
                self.owner.target(TimerSlot::ClientRetransmit),
                self.retransmit_interval,
            ));
        }

        Ok(())
    }

    /// Classify a response to the outstanding request and update the timers
    pub(crate) fn process_response(
        &mut self,
        response: &Response,
        timers: &mut Timers,
        config: &SipConfig,
    ) -> ClientOutcome {
        let method = &response.headers.cseq.method;
        let code = response.code();

        let Some(ongoing) = self.ongoing.clone() else {
            if *method == Method::INVITE && code.kind() == CodeKind::Success && self.ack.is_some()
            {
                return ClientOutcome::RetransmittedSuccess;
            }

            return ClientOutcome::Ignored;
        };

        if *method != ongoing {
            return ClientOutcome::Ignored;
        }

        match code.kind() {
            CodeKind::Provisional => {
                let ringing = ongoing == Method::INVITE && code == StatusCode::RINGING;

                if ongoing == Method::INVITE {
                    // the response proves the INVITE arrived
                    self.retransmit = None;
                } else if self.retransmit.is_some() {
                    self.retransmit_interval = config.timers.t2;
                }

                let deadline = if ringing {
                    config.timers.ringing_timeout
                } else {
                    config.timers.request_timeout
                };

                self.timeout = Some(
                    timers.start(self.owner.target(TimerSlot::ClientTimeout), deadline),
                );

                ClientOutcome::Provisional { ringing }
            }
            CodeKind::Success => {
                self.finish();
                ClientOutcome::Success(ongoing)
            }
            CodeKind::GlobalFailure if ongoing == Method::INVITE => {
                self.finish();
                ClientOutcome::Rejected(code)
            }
            _ => {
                self.finish();
                ClientOutcome::Failure(ongoing, code)
            }
        }
    }

    pub(crate) fn on_timer(
        &mut self,
        expired: &TimerExpired,
        timers: &mut Timers,
        config: &SipConfig,
    ) -> ClientTimer {
        match expired.target.slot {
            TimerSlot::ClientRetransmit if is_current(&self.retransmit, expired) => {
                let Some(request) = self.request.clone() else {
                    return ClientTimer::Stale;
                };

                self.retransmit_interval *= 2;
                if *request.method() != Method::INVITE {
                    self.retransmit_interval = self.retransmit_interval.min(config.timers.t2);
                }

                self.retransmit = Some(timers.start(
                    self.owner.target(TimerSlot::ClientRetransmit),
                    self.retransmit_interval,
                ));

                ClientTimer::Retransmit(request)
            }
            TimerSlot::ClientTimeout if is_current(&self.timeout, expired) => {
                let cancel = self.create_cancel();
                let method = self.ongoing.take();
                self.finish();

                match method {
                    Some(method) => ClientTimer::TimedOut { method, cancel },
                    None => ClientTimer::Stale,
                }
            }
            _ => ClientTimer::Stale,
        }
    }

    /// Build a CANCEL for the outstanding INVITE
    ///
    /// Copies Via, From, To, Call-ID, Route and the CSeq number from the
    /// INVITE as required by RFC 3261 section 9.1.
    pub fn create_cancel(&self) -> Option<Request> {
        if self.ongoing != Some(Method::INVITE) {
            return None;
        }

        let invite = self.request.as_ref()?;

        let mut headers = invite.headers.clone();
        headers.via.truncate(1);
        headers.cseq = CSeq::new(invite.headers.cseq.cseq, Method::CANCEL);
        headers.contact = None;
        headers.content_type = None;

        Some(Request::new(Method::CANCEL, invite.line.uri.clone(), headers))
    }

    /// Build the ACK for a non-2xx final response to the INVITE
    ///
    /// It belongs to the INVITE transaction, so it keeps its branch and
    /// takes the To header from the response.
    pub fn create_failure_ack(&self, response: &Response) -> Option<Request> {
        let invite = self.request.as_ref()?;

        if *invite.method() != Method::INVITE || invite.headers.cseq != response.headers.cseq {
            return None;
        }

        let mut headers = invite.headers.clone();
        headers.via.truncate(1);
        headers.to = response.headers.to.clone();
        headers.cseq = CSeq::new(invite.headers.cseq.cseq, Method::ACK);
        headers.contact = None;
        headers.content_type = None;

        Some(Request::new(Method::ACK, invite.line.uri.clone(), headers))
    }

    /// ACK sent for the last 2xx
    pub fn ack(&self) -> Option<&Request> {
        self.ack.as_ref()
    }

    /// Stop all timers and forget the outstanding request
    pub(crate) fn finish(&mut self) {
        self.ongoing = None;
        self.timeout = None;
        self.retransmit = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::session::SessionId;
    use sip_types::header::typed::{CallID, FromTo, Via};
    use sip_types::uri::NameAddr;
    use tokio::sync::mpsc;

    fn request(method: Method, cseq: u32) -> Request {
        let mut headers = sip_types::Headers::new(
            FromTo::new(NameAddr::uri("sip:alice@a".parse().unwrap()), Some("a".into())),
            FromTo::new(NameAddr::uri("sip:bob@b".parse().unwrap()), None),
            CallID::new("call"),
            CSeq::new(cseq, method.clone()),
        );
        headers.via.push(Via::new("UDP", "a", None, "z9hG4bK1"));

        Request::new(method, "sip:bob@b".parse().unwrap(), headers)
    }

    fn response(request: &Request, code: StatusCode) -> Response {
        let mut response = Response::new(code, request.headers.for_response());
        response.headers.to.tag = Some("b".into());
        response
    }

    fn setup() -> (ClientTransaction, Timers, mpsc::UnboundedReceiver<TimerExpired>) {
        let (tx, rx) = mpsc::unbounded_channel();

        (
            ClientTransaction::new(TimerOwner::Session(SessionId::new(1))),
            Timers::new(tx),
            rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn one_outstanding_request() {
        let (mut client, mut timers, _rx) = setup();
        let config = SipConfig::default();

        client
            .start_transaction(&request(Method::INVITE, 1), &mut timers, &config)
            .unwrap();

        assert!(matches!(
            client.start_transaction(&request(Method::BYE, 2), &mut timers, &config),
            Err(Error::TransactionBusy(Method::INVITE))
        ));

        // CANCEL and ACK never occupy the transaction
        client
            .start_transaction(&request(Method::CANCEL, 1), &mut timers, &config)
            .unwrap();
        assert_eq!(client.ongoing(), Some(&Method::INVITE));
    }

    #[tokio::test(start_paused = true)]
    async fn classify_invite_responses() {
        let (mut client, mut timers, _rx) = setup();
        let config = SipConfig::default();
        let invite = request(Method::INVITE, 1);

        client.start_transaction(&invite, &mut timers, &config).unwrap();

        assert_eq!(
            client.process_response(&response(&invite, StatusCode::TRYING), &mut timers, &config),
            ClientOutcome::Provisional { ringing: false }
        );
        assert_eq!(
            client.process_response(&response(&invite, StatusCode::RINGING), &mut timers, &config),
            ClientOutcome::Provisional { ringing: true }
        );
        assert_eq!(
            client.process_response(&response(&invite, StatusCode::DECLINE), &mut timers, &config),
            ClientOutcome::Rejected(StatusCode::DECLINE)
        );
        assert!(!client.is_busy());

        client.start_transaction(&invite, &mut timers, &config).unwrap();
        assert_eq!(
            client.process_response(&response(&invite, StatusCode::BUSY_HERE), &mut timers, &config),
            ClientOutcome::Failure(Method::INVITE, StatusCode::BUSY_HERE)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_response_is_ignored() {
        let (mut client, mut timers, _rx) = setup();
        let config = SipConfig::default();
        let invite = request(Method::INVITE, 1);

        client.start_transaction(&invite, &mut timers, &config).unwrap();

        let cancel = client.create_cancel().unwrap();
        assert_eq!(cancel.headers.cseq, CSeq::new(1, Method::CANCEL));
        assert_eq!(cancel.headers.branch(), invite.headers.branch());

        assert_eq!(
            client.process_response(&response(&cancel, StatusCode::OK), &mut timers, &config),
            ClientOutcome::Ignored
        );
        assert!(client.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn retransmit_then_timeout() {
        let (mut client, mut timers, mut rx) = setup();
        let config = SipConfig::default();

        client
            .start_transaction(&request(Method::BYE, 2), &mut timers, &config)
            .unwrap();

        let mut retransmits = 0;

        loop {
            let expired = rx.recv().await.unwrap();

            match client.on_timer(&expired, &mut timers, &config) {
                ClientTimer::Retransmit(request) => {
                    assert_eq!(request.method(), &Method::BYE);
                    retransmits += 1;
                }
                ClientTimer::TimedOut { method, cancel } => {
                    assert_eq!(method, Method::BYE);
                    assert!(cancel.is_none());
                    break;
                }
                ClientTimer::Stale => {}
            }
        }

        // 0.5, 1, 2, 4, 4, 4, ... within 32 seconds
        assert_eq!(retransmits, 10);
        assert!(!client.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_timer_is_stale() {
        let (mut client, mut timers, mut rx) = setup();
        let config = SipConfig {
            retransmit: false,
            ..SipConfig::default()
        };
        let invite = request(Method::INVITE, 1);

        client.start_transaction(&invite, &mut timers, &config).unwrap();
        client.process_response(&response(&invite, StatusCode::RINGING), &mut timers, &config);

        // ringing restarts the timeout with the extended deadline
        let start = tokio::time::Instant::now();
        let expired = rx.recv().await.unwrap();
        assert!(start.elapsed() >= config.timers.ringing_timeout);
        assert!(start.elapsed() < config.timers.ringing_timeout + Duration::from_secs(1));

        client.finish();
        assert!(matches!(
            client.on_timer(&expired, &mut timers, &config),
            ClientTimer::Stale
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_ack_keeps_branch() {
        let (mut client, mut timers, _rx) = setup();
        let config = SipConfig::default();
        let invite = request(Method::INVITE, 7);

        client.start_transaction(&invite, &mut timers, &config).unwrap();
        let busy = response(&invite, StatusCode::BUSY_HERE);
        client.process_response(&busy, &mut timers, &config);

        let ack = client.create_failure_ack(&busy).unwrap();
        assert_eq!(ack.headers.cseq, CSeq::new(7, Method::ACK));
        assert_eq!(ack.headers.branch(), invite.headers.branch());
        assert_eq!(ack.headers.to.tag.as_deref(), Some("b"));
    }
}
