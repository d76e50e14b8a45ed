use crate::config::SipConfig;
use crate::context::Context;
use crate::dialog::DialogState;
use crate::event::SipEvent;
use crate::negotiator::Negotiator;
use crate::registration::Registrations;
use crate::session::{SessionId, SessionIdAllocator};
use crate::timer::{TimerExpired, TimerOwner, TimerSlot, Timers};
use crate::transaction::{
    Answered, ClientOutcome, ClientTimer, ClientTransaction, ServerTimer, ServerTransaction,
};
use crate::transport::{Destination, Outgoing};
use crate::{Error, Result};
use bytes::Bytes;
use bytesstr::BytesStr;
use sip_types::header::typed::ContentType;
use sip_types::uri::SipUri;
use sip_types::{Message, Method, Request, Response, StatusCode};
use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Final responses of removed dialogs kept to answer retransmissions
const CLOSED_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Caller,
    Callee,
}

/// State, client and server transaction of one call
#[derive(Debug)]
pub struct Dialog {
    state: DialogState,
    client: ClientTransaction,
    server: ServerTransaction,

    role: Role,
    local_sdp: Bytes,
    remote_sdp: Bytes,

    /// We sent a CANCEL for our INVITE
    cancelled: bool,
}

impl Dialog {
    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn client(&self) -> &ClientTransaction {
        &self.client
    }

    pub fn server(&self) -> &ServerTransaction {
        &self.server
    }

    pub fn is_caller(&self) -> bool {
        self.role == Role::Caller
    }

    fn negotiated_event(&self, session: SessionId) -> SipEvent {
        SipEvent::CallNegotiated {
            session,
            local: self.local_sdp.clone(),
            remote: self.remote_sdp.clone(),
        }
    }
}

/// Result of matching an incoming request against the active dialogs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identified {
    Session(SessionId),
    /// An INVITE starting a new call
    New,
    NoMatch,
}

/// Owner of all active dialogs
///
/// Processes one event at a time: a received message, a timer expiry or a
/// call control operation. Messages to send are collected and handed out
/// by [`take_outgoing`](Self::take_outgoing), call events are sent to the
/// channel given on construction.
pub struct Transactions {
    ctx: Context,

    dialogs: BTreeMap<SessionId, Dialog>,
    ids: SessionIdAllocator,
    closed: VecDeque<Answered>,

    registrations: Registrations,
    negotiator: Box<dyn Negotiator>,
}

impl Transactions {
    pub fn new(
        config: SipConfig,
        local: SipUri,
        negotiator: Box<dyn Negotiator>,
        events: mpsc::UnboundedSender<SipEvent>,
        timers: mpsc::UnboundedSender<TimerExpired>,
    ) -> Self {
        Self {
            ctx: Context::new(config, local, Timers::new(timers), events),
            dialogs: BTreeMap::new(),
            ids: SessionIdAllocator::default(),
            closed: VecDeque::new(),
            registrations: Registrations::default(),
            negotiator,
        }
    }

    pub fn config(&self) -> &SipConfig {
        &self.ctx.config
    }

    pub fn dialog(&self, session: SessionId) -> Option<&Dialog> {
        self.dialogs.get(&session)
    }

    pub fn sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.dialogs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.dialogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialogs.is_empty()
    }

    pub fn is_registered(&self) -> bool {
        self.registrations.is_registered()
    }

    /// Messages produced since the last call
    pub fn take_outgoing(&mut self) -> Vec<Outgoing> {
        self.ctx.take_outbox()
    }

    /// Insert a dialog under a newly reserved session id
    fn create_base_dialog(&mut self, state: DialogState, role: Role) -> SessionId {
        let session = self.ids.reserve();
        let owner = TimerOwner::Session(session);

        log::info!("created dialog {session} call-id={}", state.call_id());

        self.dialogs.insert(
            session,
            Dialog {
                state,
                client: ClientTransaction::new(owner),
                server: ServerTransaction::new(owner),
                role,
                local_sdp: Bytes::new(),
                remote_sdp: Bytes::new(),
                cancelled: false,
            },
        );

        session
    }

    /// Erase a dialog, the id counter starts over once no dialog is left
    ///
    /// Dropping the dialog stops all of its timers.
    fn remove_dialog(&mut self, session: SessionId) {
        let Some(mut dialog) = self.dialogs.remove(&session) else {
            return;
        };

        log::info!("removed dialog {session} call-id={}", dialog.state.call_id());

        if let Some(answered) = dialog.server.take_answered() {
            if self.closed.len() == CLOSED_CAPACITY {
                self.closed.pop_front();
            }

            self.closed.push_back(answered);
        }

        self.negotiator.session_ended(session);

        if self.dialogs.is_empty() {
            self.ids.reset();
        }
    }

    /// Call `callee`, returns the session of the new call
    pub fn start_call(&mut self, callee: SipUri) -> Result<SessionId> {
        let state = DialogState::create_new_dialog(
            callee.clone(),
            &self.ctx.local,
            self.registrations.is_registered(),
            &self.ctx.config,
        );

        let session = self.create_base_dialog(state, Role::Caller);

        let offer = self.negotiator.create_offer(session);

        let Some(dialog) = self.dialogs.get_mut(&session) else {
            return Err(Error::UnknownSession(session));
        };

        let mut invite = dialog.state.create_request(Method::INVITE, self.ctx.create_via());
        invite.headers.user_agent = self.ctx.config.user_agent.as_deref().map(BytesStr::from);

        if !offer.is_empty() {
            invite.headers.content_type = Some(ContentType::sdp());
            invite.body = offer.clone();
        }

        dialog.local_sdp = offer;

        if let Err(e) = dialog
            .client
            .start_transaction(&invite, &mut self.ctx.timers, &self.ctx.config)
        {
            self.remove_dialog(session);
            return Err(e);
        }

        self.ctx.send_request(invite);
        self.ctx
            .emit(SipEvent::OutgoingCall { session, callee });

        Ok(session)
    }

    /// Handle a message received from the network
    #[tracing::instrument(level = "debug", skip_all, fields(call_id = %message.headers().call_id))]
    pub fn receive(&mut self, message: Message, source: SocketAddr) {
        match message {
            Message::Request(request) => self.receive_request(request, source),
            Message::Response(response) => self.receive_response(response),
        }
    }

    /// Find the dialog `request` belongs to
    ///
    /// The matching dialog advances its remote CSeq. An INVITE without To
    /// tag that matches nothing starts a new call.
    pub fn identify_request(&mut self, request: &Request) -> Identified {
        let method = request.method();

        for (session, dialog) in &mut self.dialogs {
            if dialog.state.correct_request_dialog(&request.headers, method) {
                return Identified::Session(*session);
            }
        }

        if *method == Method::INVITE && request.headers.to.tag.is_none() {
            Identified::New
        } else {
            Identified::NoMatch
        }
    }

    /// Find the dialog whose latest request `response` answers
    pub fn identify_response(&mut self, response: &Response) -> Option<SessionId> {
        let record_to_tag = response.code() != StatusCode::TRYING;

        self.dialogs
            .iter_mut()
            .find_map(|(session, dialog)| {
                dialog
                    .state
                    .correct_response_dialog(&response.headers, record_to_tag)
                    .then_some(*session)
            })
    }

    fn receive_request(&mut self, request: Request, source: SocketAddr) {
        if self.answer_retransmission(&request) {
            return;
        }

        match self.identify_request(&request) {
            Identified::Session(session) => self.in_dialog_request(session, request, source),
            Identified::New => self.incoming_call(request, source),
            Identified::NoMatch => self.out_of_dialog_request(request, source),
        }
    }

    /// Re-send the last response if `request` is a retransmission
    fn answer_retransmission(&mut self, request: &Request) -> bool {
        if *request.method() == Method::ACK {
            return false;
        }

        let repeat = self
            .dialogs
            .values()
            .find_map(|dialog| dialog.server.retransmission(request))
            .or_else(|| {
                self.closed
                    .iter()
                    .find_map(|answered| answered.repeat(request))
                    .map(|response| Some(response.clone()))
            });

        match repeat {
            Some(response) => {
                log::debug!("received retransmission of {}", request.method());

                if let Some(response) = response {
                    self.ctx.send(response);
                }

                true
            }
            None => false,
        }
    }

    fn incoming_call(&mut self, mut invite: Request, source: SocketAddr) {
        let state = match DialogState::create_dialog_from_invite(
            &mut invite,
            &self.ctx.local,
            &self.ctx.config,
        ) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("rejecting INVITE from {source}, {e}");
                self.ctx
                    .respond_stateless(&invite, StatusCode::BAD_REQUEST, source);
                return;
            }
        };

        let session = self.create_base_dialog(state, Role::Callee);
        let caller = invite.headers.from.uri.clone();

        let Some(dialog) = self.dialogs.get_mut(&session) else {
            return;
        };

        dialog.remote_sdp = invite.body.clone();

        if let Err(e) = dialog.server.receive_request(invite, source) {
            log::error!("fresh dialog {session} refused its INVITE, {e}");
            return;
        }

        let ringing = dialog.server.create_response(StatusCode::RINGING);

        if let Some(ringing) = ringing
            .and_then(|ringing| dialog.server.respond(ringing, &mut self.ctx.timers, &self.ctx.config))
        {
            self.ctx.send(ringing);
        }

        self.ctx.emit(SipEvent::IncomingCall { session, caller });

        if self.ctx.config.auto_accept {
            if let Err(e) = self.accept_call(session) {
                log::warn!("failed to auto accept call {session}, {e}");
            }
        }
    }

    fn in_dialog_request(&mut self, session: SessionId, request: Request, source: SocketAddr) {
        let method = request.method().clone();

        if method == Method::ACK {
            return self.receive_ack(session);
        }

        if method == Method::CANCEL {
            return self.receive_cancel(session, request, source);
        }

        if method == Method::BYE {
            return self.receive_bye(session, request, source);
        }

        let code = if method == Method::OPTIONS || method == Method::INFO {
            StatusCode::OK
        } else if method == Method::INVITE {
            log::warn!("dialog {session}: re-INVITE is not supported");
            StatusCode::NOT_ACCEPTABLE_HERE
        } else {
            log::warn!("dialog {session}: unsupported {method} inside dialog");
            StatusCode::METHOD_NOT_ALLOWED
        };

        let Some(dialog) = self.dialogs.get_mut(&session) else {
            return;
        };

        if dialog.server.held().is_some() {
            self.ctx
                .respond_stateless(&request, StatusCode::SERVER_INTERNAL_ERROR, source);
            return;
        }

        if dialog.server.receive_request(request, source).is_ok() {
            respond(dialog, &mut self.ctx, code);
        }
    }

    fn receive_ack(&mut self, session: SessionId) {
        let Some(dialog) = self.dialogs.get_mut(&session) else {
            return;
        };

        if !dialog.server.receive_ack() {
            log::debug!("dialog {session}: ACK without pending 2xx");
            return;
        }

        if !dialog.state.is_negotiated() {
            dialog.state.set_negotiated();
            let event = dialog.negotiated_event(session);
            self.ctx.emit(event);
        }
    }

    fn receive_cancel(&mut self, session: SessionId, cancel: Request, source: SocketAddr) {
        let Some(dialog) = self.dialogs.get_mut(&session) else {
            return;
        };

        if !dialog.server.matches_cancel(&cancel) {
            log::warn!("dialog {session}: CANCEL does not match the pending INVITE");
            self.ctx.respond_stateless(
                &cancel,
                StatusCode::CALL_OR_TRANSACTION_DOES_NOT_EXIST,
                source,
            );
            return;
        }

        let mut ok = Response::new(StatusCode::OK, cancel.headers.for_response());
        ok.headers.to.tag = Some(dialog.state.local_tag().clone());
        self.ctx.send(Outgoing::new(ok, Destination::Address(source)));

        respond(dialog, &mut self.ctx, StatusCode::REQUEST_TERMINATED);

        self.ctx.emit(SipEvent::CancelIncomingCall { session });
        self.remove_dialog(session);
    }

    fn receive_bye(&mut self, session: SessionId, bye: Request, source: SocketAddr) {
        let Some(dialog) = self.dialogs.get_mut(&session) else {
            return;
        };

        // an unanswered INVITE is terminated by the BYE
        if dialog.server.held().is_some() {
            respond(dialog, &mut self.ctx, StatusCode::REQUEST_TERMINATED);
        }

        dialog.server.receive_ack();

        if dialog.server.receive_request(bye, source).is_ok() {
            respond(dialog, &mut self.ctx, StatusCode::OK);
        }

        self.ctx.emit(SipEvent::EndCall { session });
        self.remove_dialog(session);
    }

    fn out_of_dialog_request(&mut self, request: Request, source: SocketAddr) {
        let method = request.method();

        if *method == Method::ACK {
            log::debug!("dropping ACK outside of any dialog");
            return;
        }

        let code = if *method == Method::OPTIONS {
            StatusCode::OK
        } else {
            log::warn!("rejecting {method} from {source} matching no dialog");
            StatusCode::CALL_OR_TRANSACTION_DOES_NOT_EXIST
        };

        self.ctx.respond_stateless(&request, code, source);
    }

    fn receive_response(&mut self, response: Response) {
        if self.registrations.receive_response(&mut self.ctx, &response) {
            return;
        }

        let Some(session) = self.identify_response(&response) else {
            log::debug!(
                "dropping {} response matching no dialog",
                response.code()
            );
            return;
        };

        let Some(dialog) = self.dialogs.get_mut(&session) else {
            return;
        };

        let outcome = dialog
            .client
            .process_response(&response, &mut self.ctx.timers, &self.ctx.config);

        log::debug!("dialog {session}: {outcome:?}");

        match outcome {
            ClientOutcome::Provisional { ringing: true } => {
                self.ctx.emit(SipEvent::CallRinging { session });
            }
            ClientOutcome::Provisional { ringing: false } | ClientOutcome::Ignored => {}
            ClientOutcome::Success(method) if method == Method::INVITE => {
                self.invite_accepted(session, response)
            }
            ClientOutcome::Success(method) | ClientOutcome::Failure(method, _)
                if method == Method::BYE =>
            {
                self.remove_dialog(session);
            }
            ClientOutcome::Success(method) | ClientOutcome::Failure(method, _)
                if method != Method::INVITE =>
            {
                log::debug!("dialog {session}: {method} transaction completed");
            }
            ClientOutcome::Rejected(code) => {
                if let Some(ack) = dialog.client.create_failure_ack(&response) {
                    self.ctx.send_request(ack);
                }

                self.ctx.emit(SipEvent::PeerRejected {
                    session,
                    code: Some(code),
                });
                self.remove_dialog(session);
            }
            ClientOutcome::Failure(_, code) => {
                if let Some(ack) = dialog.client.create_failure_ack(&response) {
                    self.ctx.send_request(ack);
                }

                if dialog.cancelled && code == StatusCode::REQUEST_TERMINATED {
                    self.ctx.emit(SipEvent::EndCall { session });
                } else {
                    log::warn!("dialog {session}: unhandled response {code:?} to INVITE");
                    self.ctx.emit(SipEvent::CallNegotiationFailed { session });
                }

                self.remove_dialog(session);
            }
            ClientOutcome::RetransmittedSuccess => {
                if let Some(ack) = dialog.client.ack().cloned() {
                    self.ctx.send_request(ack);
                }
            }
            ClientOutcome::Success(_) => {}
        }
    }

    fn invite_accepted(&mut self, session: SessionId, response: Response) {
        let Some(dialog) = self.dialogs.get_mut(&session) else {
            return;
        };

        dialog.state.confirm(&response);

        let ack = dialog.state.create_request(Method::ACK, self.ctx.create_via());
        if let Err(e) = dialog
            .client
            .start_transaction(&ack, &mut self.ctx.timers, &self.ctx.config)
        {
            log::warn!("dialog {session}: failed to record ACK, {e}");
        }
        self.ctx.send_request(ack);

        if dialog.cancelled {
            // the 2xx crossed our CANCEL, end the call right away
            self.ctx.emit(SipEvent::EndCall { session });
            self.terminate(session);
            return;
        }

        dialog.remote_sdp = response.body.clone();

        self.ctx.emit(SipEvent::PeerAccepted { session });

        if self.negotiator.receive_answer(session, &response.body) {
            dialog.state.set_negotiated();
            let event = dialog.negotiated_event(session);
            self.ctx.emit(event);
        } else {
            log::warn!("dialog {session}: unusable answer");
            self.ctx.emit(SipEvent::CallNegotiationFailed { session });
            self.terminate(session);
        }
    }

    /// Answer the pending incoming call of `session`
    ///
    /// The offer of the INVITE is passed to the negotiator, if it produces
    /// no answer the call is refused with `488` instead.
    pub fn accept_call(&mut self, session: SessionId) -> Result<()> {
        let dialog = self
            .dialogs
            .get_mut(&session)
            .ok_or(Error::UnknownSession(session))?;

        let offer = match dialog.server.held() {
            Some(invite) if invite.line.method == Method::INVITE => invite.body.clone(),
            _ => return Err(Error::InvalidState("no incoming call to accept")),
        };

        let Some(answer) = self.negotiator.receive_offer(session, &offer) else {
            log::warn!("dialog {session}: offer not acceptable");

            respond(dialog, &mut self.ctx, StatusCode::NOT_ACCEPTABLE_HERE);
            self.ctx.emit(SipEvent::CallNegotiationFailed { session });
            self.remove_dialog(session);

            return Ok(());
        };

        let mut ok = dialog
            .server
            .create_response(StatusCode::OK)
            .ok_or(Error::InvalidState("no incoming call to accept"))?;

        ok.headers.contact = Some(dialog.state.local_contact().clone());
        ok.headers.user_agent = self.ctx.config.user_agent.as_deref().map(BytesStr::from);

        if !answer.is_empty() {
            ok.headers.content_type = Some(ContentType::sdp());
            ok.body = answer.clone();
        }

        dialog.local_sdp = answer;
        dialog.remote_sdp = offer;

        if let Some(ok) = dialog
            .server
            .respond(ok, &mut self.ctx.timers, &self.ctx.config)
        {
            self.ctx.send(ok);
        }

        Ok(())
    }

    /// Decline the pending incoming call of `session` with `603 Decline`
    pub fn reject_call(&mut self, session: SessionId) -> Result<()> {
        let dialog = self
            .dialogs
            .get_mut(&session)
            .ok_or(Error::UnknownSession(session))?;

        if !dialog
            .server
            .held()
            .is_some_and(|request| request.line.method == Method::INVITE)
        {
            return Err(Error::InvalidState("no incoming call to reject"));
        }

        respond(dialog, &mut self.ctx, StatusCode::DECLINE);
        self.remove_dialog(session);

        Ok(())
    }

    /// Cancel our unanswered INVITE
    ///
    /// The dialog is removed once the `487` for the INVITE arrives or the
    /// INVITE times out.
    pub fn cancel_call(&mut self, session: SessionId) -> Result<()> {
        let dialog = self
            .dialogs
            .get_mut(&session)
            .ok_or(Error::UnknownSession(session))?;

        let cancel = dialog
            .client
            .create_cancel()
            .ok_or(Error::InvalidState("no pending INVITE to cancel"))?;

        dialog
            .client
            .start_transaction(&cancel, &mut self.ctx.timers, &self.ctx.config)?;
        dialog.cancelled = true;

        self.ctx.send_request(cancel);

        Ok(())
    }

    /// End the call of `session` in whatever state it is
    ///
    /// Unanswered incoming calls are declined, unanswered outgoing calls are
    /// cancelled, established calls receive a BYE.
    pub fn end_call(&mut self, session: SessionId) -> Result<()> {
        let dialog = self
            .dialogs
            .get(&session)
            .ok_or(Error::UnknownSession(session))?;

        let pending_incoming = dialog
            .server
            .held()
            .is_some_and(|request| request.line.method == Method::INVITE);

        let pending_outgoing = dialog.client.ongoing() == Some(&Method::INVITE);

        if pending_incoming {
            self.reject_call(session)?;
        } else if pending_outgoing {
            return self.cancel_call(session);
        } else {
            self.send_bye(session)?;
        }

        self.ctx.emit(SipEvent::EndCall { session });

        Ok(())
    }

    /// Send a BYE, the dialog is removed when the BYE completes
    fn send_bye(&mut self, session: SessionId) -> Result<()> {
        let dialog = self
            .dialogs
            .get_mut(&session)
            .ok_or(Error::UnknownSession(session))?;

        if let Some(ongoing) = dialog.client.ongoing() {
            return Err(Error::TransactionBusy(ongoing.clone()));
        }

        // stop retransmitting an unacknowledged 2xx
        dialog.server.receive_ack();

        let bye = dialog.state.create_request(Method::BYE, self.ctx.create_via());
        dialog
            .client
            .start_transaction(&bye, &mut self.ctx.timers, &self.ctx.config)?;

        self.ctx.send_request(bye);

        Ok(())
    }

    /// Leave the call without waiting for the application, if the BYE can't
    /// be sent the dialog is dropped right away
    fn terminate(&mut self, session: SessionId) {
        if let Err(e) = self.send_bye(session) {
            log::warn!("dialog {session}: cannot send BYE, {e}");
            self.remove_dialog(session);
        }
    }

    /// End every call and remove all dialogs, used on shutdown
    pub fn end_all_calls(&mut self) {
        let sessions: Vec<SessionId> = self.dialogs.keys().copied().collect();

        for session in sessions {
            if let Err(e) = self.end_call(session) {
                log::warn!("failed to end call {session}, {e}");
            }

            self.remove_dialog(session);
        }
    }

    /// Register at `registrar`, or the configured registrar if `None`
    pub fn register(&mut self, registrar: Option<SipUri>) -> Result<()> {
        let registrar = registrar
            .or_else(|| self.ctx.config.registrar.clone())
            .ok_or(Error::InvalidState("no registrar configured"))?;

        self.registrations.register(&mut self.ctx, registrar)
    }

    pub fn unregister_all(&mut self) {
        self.registrations.unregister_all(&mut self.ctx);
    }

    /// Handle a timer expiry
    pub fn on_timer(&mut self, expired: TimerExpired) {
        let session = match expired.target.owner {
            TimerOwner::Registration(_) => {
                self.registrations.on_timer(&mut self.ctx, &expired);
                return;
            }
            TimerOwner::Session(session) => session,
        };

        let Some(dialog) = self.dialogs.get_mut(&session) else {
            return;
        };

        match expired.target.slot {
            TimerSlot::ClientTimeout | TimerSlot::ClientRetransmit => {
                match dialog
                    .client
                    .on_timer(&expired, &mut self.ctx.timers, &self.ctx.config)
                {
                    ClientTimer::Retransmit(request) => self.ctx.send_request(request),
                    ClientTimer::TimedOut { method, cancel } if method == Method::INVITE => {
                        log::info!("dialog {session}: INVITE timed out");

                        if let Some(cancel) = cancel {
                            self.ctx.send_request(cancel);
                        }

                        let bye = dialog.state.create_request(Method::BYE, self.ctx.create_via());
                        self.ctx.send_request(bye);

                        let event = if dialog.cancelled {
                            SipEvent::EndCall { session }
                        } else {
                            SipEvent::PeerRejected {
                                session,
                                code: None,
                            }
                        };

                        self.ctx.emit(event);
                        self.remove_dialog(session);
                    }
                    ClientTimer::TimedOut { method, .. } => {
                        log::info!("dialog {session}: {method} timed out");

                        if method == Method::BYE {
                            self.remove_dialog(session);
                        }
                    }
                    ClientTimer::Stale => {}
                }
            }
            TimerSlot::ServerRetransmit | TimerSlot::ServerTimeout => {
                match dialog
                    .server
                    .on_timer(&expired, &mut self.ctx.timers, &self.ctx.config)
                {
                    ServerTimer::Retransmit(response) => self.ctx.send(response),
                    ServerTimer::AckTimeout => {
                        log::warn!("dialog {session}: no ACK for 2xx, ending call");

                        self.ctx.emit(SipEvent::CallNegotiationFailed { session });
                        self.terminate(session);
                    }
                    ServerTimer::Stale => {}
                }
            }
            TimerSlot::Refresh => {}
        }
    }
}

/// Answer the held request of `dialog` with a bare response
fn respond(dialog: &mut Dialog, ctx: &mut Context, code: StatusCode) {
    let Some(response) = dialog.server.create_response(code) else {
        return;
    };

    if let Some(outgoing) = dialog.server.respond(response, &mut ctx.timers, &ctx.config) {
        ctx.send(outgoing);
    }
}
