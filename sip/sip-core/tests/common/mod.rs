#![allow(dead_code)]

use bytes::Bytes;
use sip_types::uri::SipUri;
use sip_types::{Message, Method, Request, Response};
use std::net::SocketAddr;
use tokio::sync::mpsc;
use vcall_sip_core::{
    Negotiator, NoNegotiation, SessionId, SipConfig, SipEvent, TimerExpired, Transactions,
};

/// One side of a call, driven by hand
pub(crate) struct Peer {
    pub(crate) transactions: Transactions,
    pub(crate) events: mpsc::UnboundedReceiver<SipEvent>,
    pub(crate) timers: mpsc::UnboundedReceiver<TimerExpired>,
    pub(crate) addr: SocketAddr,
}

impl Peer {
    pub(crate) fn new(username: &str, addr: &str, config: SipConfig) -> Self {
        Self::with_negotiator(username, addr, config, NoNegotiation)
    }

    pub(crate) fn with_negotiator(
        username: &str,
        addr: &str,
        config: SipConfig,
        negotiator: impl Negotiator,
    ) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (timers_tx, timers) = mpsc::unbounded_channel();

        let config = SipConfig {
            username: username.into(),
            initial_cseq: Some(0),
            ..config
        };

        let transactions = Transactions::new(
            config,
            SipUri::from_host_port(addr).unwrap(),
            Box::new(negotiator),
            events_tx,
            timers_tx,
        );

        Self {
            transactions,
            events,
            timers,
            addr: addr.parse().unwrap(),
        }
    }

    /// Our address as seen by the other peer
    pub(crate) fn uri(&self, user: &str) -> SipUri {
        SipUri::from_host_port(&self.addr.to_string())
            .unwrap()
            .with_user(user)
    }

    /// Drain all events emitted so far
    pub(crate) fn events(&mut self) -> Vec<SipEvent> {
        let mut events = Vec::new();

        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }

        events
    }

    /// Messages queued for sending, passed through the wire format
    pub(crate) fn outgoing(&mut self) -> Vec<Message> {
        self.transactions
            .take_outgoing()
            .into_iter()
            .map(|outgoing| Message::parse(&outgoing.message.to_bytes()).unwrap())
            .collect()
    }

    /// Feed `messages` as if received from `from`
    pub(crate) fn receive(&mut self, messages: Vec<Message>, from: SocketAddr) {
        for message in messages {
            self.transactions.receive(message, from);
        }
    }

    /// Process the next timer expiry
    pub(crate) async fn next_timer(&mut self) {
        let expired = self.timers.recv().await.unwrap();
        self.transactions.on_timer(expired);
    }
}

/// Move all queued messages of `from` to `to`, returns what was delivered
pub(crate) fn deliver(from: &mut Peer, to: &mut Peer) -> Vec<Message> {
    let messages = from.outgoing();
    to.receive(messages.clone(), from.addr);
    messages
}

/// Deliver in both directions until both peers are quiet
pub(crate) fn exchange(a: &mut Peer, b: &mut Peer) {
    loop {
        let a_sent = deliver(a, b);
        let b_sent = deliver(b, a);

        if a_sent.is_empty() && b_sent.is_empty() {
            break;
        }
    }
}

pub(crate) fn alice_and_bob() -> (Peer, Peer) {
    (
        Peer::new("alice", "127.0.0.1:5070", SipConfig::default()),
        Peer::new("bob", "127.0.0.1:5080", SipConfig::default()),
    )
}

pub(crate) fn requests(messages: &[Message]) -> Vec<&Request> {
    messages
        .iter()
        .filter_map(|message| match message {
            Message::Request(request) => Some(request),
            Message::Response(_) => None,
        })
        .collect()
}

pub(crate) fn responses(messages: &[Message]) -> Vec<&Response> {
    messages
        .iter()
        .filter_map(|message| match message {
            Message::Response(response) => Some(response),
            Message::Request(_) => None,
        })
        .collect()
}

pub(crate) fn methods(messages: &[Message]) -> Vec<Method> {
    requests(messages)
        .into_iter()
        .map(|request| request.method().clone())
        .collect()
}

pub(crate) fn codes(messages: &[Message]) -> Vec<u16> {
    responses(messages)
        .into_iter()
        .map(|response| response.code().into_u16())
        .collect()
}

/// Alice calls Bob, Bob answers, the ACK reaches Bob
pub(crate) fn establish(alice: &mut Peer, bob: &mut Peer) -> (SessionId, SessionId) {
    let callee = bob.uri("bob");
    let alice_session = alice.transactions.start_call(callee).unwrap();

    deliver(alice, bob);

    let bob_session = bob
        .events()
        .into_iter()
        .find_map(|event| match event {
            SipEvent::IncomingCall { session, .. } => Some(session),
            _ => None,
        })
        .unwrap();

    bob.transactions.accept_call(bob_session).unwrap();
    exchange(alice, bob);

    (alice_session, bob_session)
}

/// Negotiator exchanging fixed descriptions
pub(crate) struct FixedSdp {
    pub(crate) offer: Bytes,
    pub(crate) answer: Option<Bytes>,
}

impl FixedSdp {
    pub(crate) fn new(offer: &'static str, answer: Option<&'static str>) -> Self {
        Self {
            offer: Bytes::from_static(offer.as_bytes()),
            answer: answer.map(|answer| Bytes::from_static(answer.as_bytes())),
        }
    }
}

impl Negotiator for FixedSdp {
    fn create_offer(&mut self, _: SessionId) -> Bytes {
        self.offer.clone()
    }

    fn receive_offer(&mut self, _: SessionId, _: &Bytes) -> Option<Bytes> {
        self.answer.clone()
    }

    fn receive_answer(&mut self, _: SessionId, answer: &Bytes) -> bool {
        !answer.is_empty()
    }
}
