use crate::config::SipConfig;
use crate::event::SipEvent;
use crate::timer::Timers;
use crate::transport::{Destination, Outgoing, Udp};
use crate::util::{TAG_LEN, generate_branch, random_string};
use sip_types::header::typed::Via;
use sip_types::uri::SipUri;
use sip_types::{Request, Response, StatusCode};
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Everything the manager and its parts share while handling one event
#[derive(Debug)]
pub(crate) struct Context {
    pub(crate) config: SipConfig,
    /// Our `host[:port]`
    pub(crate) local: SipUri,
    pub(crate) timers: Timers,
    outbox: Vec<Outgoing>,
    events: mpsc::UnboundedSender<SipEvent>,
}

impl Context {
    pub(crate) fn new(
        config: SipConfig,
        local: SipUri,
        timers: Timers,
        events: mpsc::UnboundedSender<SipEvent>,
    ) -> Self {
        Self {
            config,
            local,
            timers,
            outbox: Vec::new(),
            events,
        }
    }

    pub(crate) fn emit(&self, event: SipEvent) {
        log::debug!("emitting {event:?}");

        if self.events.send(event).is_err() {
            log::debug!("call events receiver is gone");
        }
    }

    pub(crate) fn send(&mut self, outgoing: Outgoing) {
        self.outbox.push(outgoing);
    }

    /// Queue a request to its first route or the request-uri
    pub(crate) fn send_request(&mut self, request: Request) {
        let target = match request.headers.route.first() {
            Some(route) => route.uri.uri.clone(),
            None => request.line.uri.clone(),
        };

        self.send(Outgoing::new(request, Destination::Uri(target)));
    }

    /// Answer `request` outside of any transaction
    pub(crate) fn respond_stateless(
        &mut self,
        request: &Request,
        code: StatusCode,
        source: SocketAddr,
    ) {
        let mut response = Response::new(code, request.headers.for_response());

        if response.headers.to.tag.is_none() {
            response.headers.to.tag = Some(random_string(TAG_LEN));
        }

        self.send(Outgoing::new(response, Destination::Address(source)));
    }

    /// Via for a new client transaction
    pub(crate) fn create_via(&self) -> Via {
        Via::new(
            Udp::NAME,
            self.local.host.clone(),
            self.local.port,
            generate_branch(),
        )
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }
}
