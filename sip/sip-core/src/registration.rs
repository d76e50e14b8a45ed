//! REGISTER bindings at one or more registrars

use crate::context::Context;
use crate::event::SipEvent;
use crate::timer::{Timer, TimerExpired, TimerOwner, TimerSlot, is_current};
use crate::transaction::{ClientOutcome, ClientTimer, ClientTransaction};
use crate::util::{CALL_ID_LEN, TAG_LEN, random_sequence_number, random_string};
use crate::{Error, Result};
use bytesstr::BytesStr;
use sip_types::header::typed::{CSeq, CallID, Contact, FromTo};
use sip_types::uri::{NameAddr, SipUri};
use sip_types::{Headers, Method, Request, Response};
use std::time::Duration;

const MIN_REFRESH: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Binding {
    id: u32,
    registrar: SipUri,

    call_id: CallID,
    local_tag: BytesStr,
    cseq: u32,

    client: ClientTransaction,
    refresh: Option<Timer>,

    registered: bool,
    /// An `Expires: 0` REGISTER is outstanding
    unregistering: bool,
}

impl Binding {
    fn new(id: u32, registrar: SipUri, ctx: &Context) -> Self {
        Self {
            id,
            registrar,
            call_id: CallID::new(random_string(CALL_ID_LEN)),
            local_tag: random_string(TAG_LEN),
            cseq: ctx
                .config
                .initial_cseq
                .unwrap_or_else(random_sequence_number),
            client: ClientTransaction::new(TimerOwner::Registration(id)),
            refresh: None,
            registered: false,
            unregistering: false,
        }
    }

    /// Every REGISTER of a binding shares Call-ID and From tag, only the
    /// CSeq increases
    fn send_register(&mut self, ctx: &mut Context, expires: u32) -> Result<()> {
        if let Some(ongoing) = self.client.ongoing() {
            return Err(Error::TransactionBusy(ongoing.clone()));
        }

        self.cseq = self.cseq.wrapping_add(1);

        let aor = NameAddr::uri(
            SipUri {
                port: self.registrar.port,
                ..SipUri::new(self.registrar.host.clone())
            }
            .with_user(ctx.config.username.as_str()),
        );

        let mut headers = Headers::new(
            FromTo::new(aor.clone(), Some(self.local_tag.clone())),
            FromTo::new(aor, None),
            self.call_id.clone(),
            CSeq::new(self.cseq, Method::REGISTER),
        );

        headers.via.push(ctx.create_via());
        headers.max_forwards = Some(70);
        headers.contact = Some(Contact::new(NameAddr::uri(
            SipUri {
                port: ctx.local.port,
                ..SipUri::new(ctx.local.host.clone())
            }
            .with_user(ctx.config.username.as_str()),
        )));
        headers.expires = Some(expires);
        headers.user_agent = ctx.config.user_agent.as_deref().map(BytesStr::from);

        let request_uri = SipUri {
            port: self.registrar.port,
            ..SipUri::new(self.registrar.host.clone())
        };

        let request = Request::new(Method::REGISTER, request_uri, headers);

        self.client
            .start_transaction(&request, &mut ctx.timers, &ctx.config)?;

        log::debug!("sending REGISTER to {} expires={expires}", self.registrar);
        ctx.send_request(request);

        Ok(())
    }

    fn owns(&self, headers: &Headers) -> bool {
        headers.call_id == self.call_id && headers.from.tag.as_ref() == Some(&self.local_tag)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Registrations {
    bindings: Vec<Binding>,
    next_id: u32,
}

impl Registrations {
    pub(crate) fn is_registered(&self) -> bool {
        self.bindings.iter().any(|binding| binding.registered)
    }

    /// Register at `registrar`, refreshing the binding if one exists
    pub(crate) fn register(&mut self, ctx: &mut Context, registrar: SipUri) -> Result<()> {
        let expires = ctx.config.register_expires;

        if let Some(binding) = self
            .bindings
            .iter_mut()
            .find(|binding| binding.registrar.compare(&registrar))
        {
            binding.unregistering = false;
            return binding.send_register(ctx, expires);
        }

        self.next_id += 1;

        let mut binding = Binding::new(self.next_id, registrar, ctx);
        binding.send_register(ctx, expires)?;

        self.bindings.push(binding);

        Ok(())
    }

    /// Remove every binding with an `Expires: 0` REGISTER
    pub(crate) fn unregister_all(&mut self, ctx: &mut Context) {
        for binding in &mut self.bindings {
            binding.refresh = None;
            binding.unregistering = true;

            if let Err(e) = binding.send_register(ctx, 0) {
                log::warn!("cannot unregister from {}, {e}", binding.registrar);
            }
        }
    }

    /// Returns false if the response does not belong to any binding
    pub(crate) fn receive_response(&mut self, ctx: &mut Context, response: &Response) -> bool {
        let Some(idx) = self
            .bindings
            .iter()
            .position(|binding| binding.owns(&response.headers))
        else {
            return false;
        };

        let binding = &mut self.bindings[idx];

        if response.headers.cseq.cseq != binding.cseq {
            log::debug!("dropping stale REGISTER response");
            return true;
        }

        match binding
            .client
            .process_response(response, &mut ctx.timers, &ctx.config)
        {
            ClientOutcome::Success(_) if binding.unregistering => {
                log::info!("unregistered from {}", binding.registrar);
                self.bindings.remove(idx);
            }
            ClientOutcome::Success(_) => {
                let granted = response
                    .headers
                    .contact
                    .as_ref()
                    .and_then(Contact::expires)
                    .or(response.headers.expires)
                    .unwrap_or(ctx.config.register_expires);

                log::info!("registered at {} for {granted}s", binding.registrar);

                binding.registered = true;
                binding.refresh = (granted > 0).then(|| {
                    let after = Duration::from_secs(u64::from(granted) / 2).max(MIN_REFRESH);

                    ctx.timers
                        .start(TimerOwner::Registration(binding.id).target(TimerSlot::Refresh), after)
                });

                ctx.emit(SipEvent::RegisteredToServer {
                    registrar: binding.registrar.clone(),
                });
            }
            ClientOutcome::Rejected(code) | ClientOutcome::Failure(_, code) => {
                log::warn!("REGISTER at {} failed with {code:?}", binding.registrar);

                let registrar = binding.registrar.clone();
                self.failed(idx);

                ctx.emit(SipEvent::RegisteringFailed {
                    registrar,
                    code: Some(code),
                });
            }
            ClientOutcome::Provisional { .. }
            | ClientOutcome::RetransmittedSuccess
            | ClientOutcome::Ignored => {}
        }

        true
    }

    pub(crate) fn on_timer(&mut self, ctx: &mut Context, expired: &TimerExpired) {
        let TimerOwner::Registration(id) = expired.target.owner else {
            return;
        };

        let Some(idx) = self.bindings.iter().position(|binding| binding.id == id) else {
            return;
        };

        let binding = &mut self.bindings[idx];

        if expired.target.slot == TimerSlot::Refresh {
            if is_current(&binding.refresh, expired) {
                binding.refresh = None;

                let expires = ctx.config.register_expires;
                if let Err(e) = binding.send_register(ctx, expires) {
                    log::warn!("failed to refresh registration, {e}");
                }
            }

            return;
        }

        match binding
            .client
            .on_timer(expired, &mut ctx.timers, &ctx.config)
        {
            ClientTimer::Retransmit(request) => ctx.send_request(request),
            ClientTimer::TimedOut { .. } => {
                log::warn!("REGISTER at {} timed out", binding.registrar);

                let registrar = binding.registrar.clone();
                self.failed(idx);

                ctx.emit(SipEvent::RegisteringFailed {
                    registrar,
                    code: None,
                });
            }
            ClientTimer::Stale => {}
        }
    }

    fn failed(&mut self, idx: usize) {
        let binding = &mut self.bindings[idx];

        if binding.unregistering {
            self.bindings.remove(idx);
        } else {
            binding.registered = false;
            binding.refresh = None;
        }
    }
}
