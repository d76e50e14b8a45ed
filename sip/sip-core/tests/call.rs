use bytes::Bytes;
use common::{
    FixedSdp, Peer, alice_and_bob, codes, deliver, establish, exchange, methods, requests,
};
use sip_types::header::typed::{CSeq, ContentType, Via};
use sip_types::{Message, Method, Request, StatusCode};
use vcall_sip_core::{Error, SessionId, SipConfig, SipEvent};

mod common;

#[tokio::test(start_paused = true)]
async fn call_established_and_ended() {
    let (mut alice, mut bob) = alice_and_bob();

    let callee = bob.uri("bob");
    let session = alice.transactions.start_call(callee.clone()).unwrap();
    assert_eq!(session, SessionId::new(1));

    let sent = deliver(&mut alice, &mut bob);
    let invite = requests(&sent)[0];
    assert_eq!(invite.method(), &Method::INVITE);
    assert_eq!(invite.headers.cseq.cseq, 1);
    assert!(invite.headers.to.tag.is_none());

    let bob_session = match bob.events().as_slice() {
        [SipEvent::IncomingCall { session, caller }] => {
            assert_eq!(caller.uri.user.as_deref(), Some("alice"));
            *session
        }
        events => panic!("unexpected events {events:?}"),
    };

    // ringing only, no 100 Trying
    let sent = deliver(&mut bob, &mut alice);
    assert_eq!(codes(&sent), [180]);
    assert_eq!(
        alice.events(),
        [
            SipEvent::OutgoingCall { session, callee },
            SipEvent::CallRinging { session }
        ]
    );

    bob.transactions.accept_call(bob_session).unwrap();

    let sent = deliver(&mut bob, &mut alice);
    assert_eq!(codes(&sent), [200]);
    assert_eq!(
        alice.events(),
        [
            SipEvent::PeerAccepted { session },
            SipEvent::CallNegotiated {
                session,
                local: Bytes::new(),
                remote: Bytes::new()
            }
        ]
    );

    let sent = deliver(&mut alice, &mut bob);
    let ack = requests(&sent)[0];
    assert_eq!(ack.method(), &Method::ACK);
    assert_eq!(ack.headers.cseq.cseq, 1);
    assert_eq!(
        bob.events(),
        [SipEvent::CallNegotiated {
            session: bob_session,
            local: Bytes::new(),
            remote: Bytes::new()
        }]
    );

    let alice_state = alice.transactions.dialog(session).unwrap().state();
    let bob_state = bob.transactions.dialog(bob_session).unwrap().state();
    assert_eq!(alice_state.remote_tag(), Some(bob_state.local_tag()));
    assert_eq!(bob_state.remote_tag(), Some(alice_state.local_tag()));
    assert!(alice_state.is_negotiated());

    alice.transactions.end_call(session).unwrap();
    assert_eq!(alice.events(), [SipEvent::EndCall { session }]);

    let sent = deliver(&mut alice, &mut bob);
    assert_eq!(methods(&sent), [Method::BYE]);
    assert_eq!(requests(&sent)[0].headers.cseq.cseq, 2);
    assert_eq!(bob.events(), [SipEvent::EndCall { session: bob_session }]);
    assert!(bob.transactions.is_empty());

    let sent = deliver(&mut bob, &mut alice);
    assert_eq!(codes(&sent), [200]);
    assert!(alice.transactions.is_empty());

    // ids start over once no call is left
    let next = alice.transactions.start_call(bob.uri("bob")).unwrap();
    assert_eq!(next, SessionId::new(1));
}

#[tokio::test(start_paused = true)]
async fn callee_ends_call() {
    let (mut alice, mut bob) = alice_and_bob();
    let (alice_session, bob_session) = establish(&mut alice, &mut bob);
    alice.events();
    bob.events();

    bob.transactions.end_call(bob_session).unwrap();

    let sent = deliver(&mut bob, &mut alice);
    let bye = requests(&sent)[0];
    assert_eq!(bye.method(), &Method::BYE);
    // the callee numbers its requests independently of the caller
    assert_eq!(bye.headers.cseq.cseq, 1);
    assert_eq!(
        alice.events(),
        [SipEvent::EndCall {
            session: alice_session
        }]
    );

    deliver(&mut alice, &mut bob);
    assert!(alice.transactions.is_empty());
    assert!(bob.transactions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_before_answer() {
    let (mut alice, mut bob) = alice_and_bob();

    let session = alice.transactions.start_call(bob.uri("bob")).unwrap();
    deliver(&mut alice, &mut bob);
    deliver(&mut bob, &mut alice);
    alice.events();

    alice.transactions.cancel_call(session).unwrap();

    let sent = deliver(&mut alice, &mut bob);
    let cancel = requests(&sent)[0];
    assert_eq!(cancel.method(), &Method::CANCEL);
    assert_eq!(cancel.headers.cseq.cseq, 1);

    let bob_events = bob.events();
    assert!(matches!(
        bob_events.as_slice(),
        [SipEvent::IncomingCall { .. }, SipEvent::CancelIncomingCall { .. }]
    ));
    assert!(bob.transactions.is_empty());

    // 200 for the CANCEL, 487 for the INVITE
    let sent = deliver(&mut bob, &mut alice);
    assert_eq!(codes(&sent), [200, 487]);
    assert_eq!(alice.events(), [SipEvent::EndCall { session }]);
    assert!(alice.transactions.is_empty());

    // the ACK for the 487 reaches no dialog and is dropped
    let sent = deliver(&mut alice, &mut bob);
    assert_eq!(methods(&sent), [Method::ACK]);
    assert!(bob.outgoing().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_for_another_invite_is_refused() {
    let (mut alice, mut bob) = alice_and_bob();

    let session = alice.transactions.start_call(bob.uri("bob")).unwrap();
    let sent = deliver(&mut alice, &mut bob);
    let invite = requests(&sent)[0].clone();

    let bob_session = bob.transactions.sessions().next().unwrap();
    assert_eq!(codes(&bob.outgoing()), [180]);

    let cancel = |branch: String, cseq: u32| {
        let mut headers = invite.headers.clone();
        headers.via = vec![Via::new("UDP", "127.0.0.1", Some(5070), branch)];
        headers.cseq = CSeq::new(cseq, Method::CANCEL);

        Message::Request(Request::new(
            Method::CANCEL,
            invite.line.uri.clone(),
            headers,
        ))
    };

    let own_branch = invite.headers.branch().unwrap().to_string();
    let own_cseq = invite.headers.cseq.cseq;

    // same dialog, but a different transaction
    bob.receive(vec![cancel("z9hG4bKforeign".to_owned(), own_cseq)], alice.addr);
    assert_eq!(codes(&bob.outgoing()), [481]);

    bob.receive(vec![cancel(own_branch.clone(), own_cseq + 1)], alice.addr);
    assert_eq!(codes(&bob.outgoing()), [481]);

    assert!(matches!(
        bob.events().as_slice(),
        [SipEvent::IncomingCall { .. }]
    ));
    assert!(
        bob.transactions
            .dialog(bob_session)
            .unwrap()
            .server()
            .held()
            .is_some()
    );

    // the INVITE can still be answered
    bob.transactions.accept_call(bob_session).unwrap();
    exchange(&mut alice, &mut bob);

    assert!(alice.events().iter().any(|event| matches!(
        event,
        SipEvent::CallNegotiated { session: s, .. } if *s == session
    )));
    assert!(
        bob.events()
            .iter()
            .any(|event| matches!(event, SipEvent::CallNegotiated { .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn answer_crossing_cancel() {
    let (mut alice, mut bob) = alice_and_bob();

    let session = alice.transactions.start_call(bob.uri("bob")).unwrap();
    deliver(&mut alice, &mut bob);
    let bob_session = bob.transactions.sessions().next().unwrap();

    // bob answers while alice's CANCEL is on the way
    bob.transactions.accept_call(bob_session).unwrap();
    alice.transactions.cancel_call(session).unwrap();

    let sent = deliver(&mut alice, &mut bob);
    assert_eq!(methods(&sent), [Method::CANCEL]);

    let sent = deliver(&mut bob, &mut alice);
    assert_eq!(codes(&sent), [180, 200, 481]);

    // alice confirms the 2xx and ends the call right away
    let sent = deliver(&mut alice, &mut bob);
    assert_eq!(methods(&sent), [Method::ACK, Method::BYE]);

    let alice_events = alice.events();
    assert!(alice_events.contains(&SipEvent::EndCall { session }));
    assert!(!alice_events.contains(&SipEvent::PeerAccepted { session }));

    assert!(bob.events().contains(&SipEvent::EndCall {
        session: bob_session
    }));

    exchange(&mut alice, &mut bob);
    assert!(alice.transactions.is_empty());
    assert!(bob.transactions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn callee_declines() {
    let (mut alice, mut bob) = alice_and_bob();

    let session = alice.transactions.start_call(bob.uri("bob")).unwrap();
    let sent = deliver(&mut alice, &mut bob);
    let invite = sent[0].clone();

    let bob_session = bob.transactions.sessions().next().unwrap();
    bob.transactions.reject_call(bob_session).unwrap();
    assert!(bob.transactions.is_empty());
    assert!(matches!(
        bob.events().as_slice(),
        [SipEvent::IncomingCall { .. }]
    ));

    let sent = deliver(&mut bob, &mut alice);
    assert_eq!(codes(&sent), [180, 603]);

    let events = alice.events();
    assert_eq!(
        events.last(),
        Some(&SipEvent::PeerRejected {
            session,
            code: Some(StatusCode::DECLINE)
        })
    );
    assert!(alice.transactions.is_empty());

    let sent = deliver(&mut alice, &mut bob);
    assert_eq!(methods(&sent), [Method::ACK]);
    assert!(bob.outgoing().is_empty());

    // a late retransmission of the INVITE is answered from the closed dialog
    bob.receive(vec![invite], alice.addr);
    assert_eq!(codes(&bob.outgoing()), [603]);
    assert!(bob.events().is_empty());
    assert!(bob.transactions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn retransmitted_invite_repeats_ringing() {
    let (mut alice, mut bob) = alice_and_bob();

    alice.transactions.start_call(bob.uri("bob")).unwrap();
    let sent = deliver(&mut alice, &mut bob);
    assert_eq!(codes(&bob.outgoing()), [180]);
    assert_eq!(bob.events().len(), 1);

    bob.receive(sent, alice.addr);

    assert_eq!(codes(&bob.outgoing()), [180]);
    assert!(bob.events().is_empty());
    assert_eq!(bob.transactions.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_dialogs_are_isolated() {
    let (mut alice, mut bob) = alice_and_bob();

    let first = alice.transactions.start_call(bob.uri("bob")).unwrap();
    let second = alice.transactions.start_call(bob.uri("bob")).unwrap();
    assert_ne!(first, second);

    deliver(&mut alice, &mut bob);
    let bob_sessions: Vec<SessionId> = bob.transactions.sessions().collect();
    assert_eq!(bob_sessions.len(), 2);

    let first_call_id = alice.transactions.dialog(first).unwrap().state().call_id().clone();
    let bob_first = bob_sessions
        .iter()
        .copied()
        .find(|session| {
            bob.transactions.dialog(*session).unwrap().state().call_id() == &first_call_id
        })
        .unwrap();
    let bob_second = bob_sessions
        .iter()
        .copied()
        .find(|session| *session != bob_first)
        .unwrap();

    bob.transactions.reject_call(bob_first).unwrap();
    bob.transactions.accept_call(bob_second).unwrap();
    exchange(&mut alice, &mut bob);

    let events = alice.events();
    assert!(events.contains(&SipEvent::PeerRejected {
        session: first,
        code: Some(StatusCode::DECLINE)
    }));
    assert!(events.contains(&SipEvent::PeerAccepted { session: second }));
    assert!(!events.contains(&SipEvent::PeerAccepted { session: first }));

    assert!(alice.transactions.dialog(first).is_none());
    assert!(alice.transactions.dialog(second).unwrap().state().is_negotiated());
    assert!(bob.transactions.dialog(bob_second).unwrap().state().is_negotiated());
}

#[tokio::test(start_paused = true)]
async fn stale_cseq_is_rejected() {
    let (mut alice, mut bob) = alice_and_bob();
    let (alice_session, bob_session) = establish(&mut alice, &mut bob);

    alice.transactions.end_call(alice_session).unwrap();
    let sent = alice.outgoing();

    let Message::Request(bye) = &sent[0] else {
        panic!("expected BYE");
    };
    let mut stale = bye.clone();
    stale.headers.cseq.cseq = 1;

    bob.receive(vec![Message::Request(stale)], alice.addr);
    assert_eq!(codes(&bob.outgoing()), [481]);
    assert!(bob.transactions.dialog(bob_session).is_some());

    bob.receive(sent, alice.addr);
    assert_eq!(codes(&bob.outgoing()), [200]);
    assert!(bob.transactions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn one_request_at_a_time() {
    let (mut alice, mut bob) = alice_and_bob();
    let (alice_session, _) = establish(&mut alice, &mut bob);

    alice.transactions.end_call(alice_session).unwrap();

    assert!(matches!(
        alice.transactions.end_call(alice_session),
        Err(Error::TransactionBusy(method)) if method == Method::BYE
    ));
    assert!(matches!(
        alice.transactions.cancel_call(alice_session),
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(
        alice.transactions.accept_call(SessionId::new(42)),
        Err(Error::UnknownSession(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn requests_outside_of_dialogs() {
    let (mut alice, mut bob) = alice_and_bob();

    let request = |method: &str, cseq: u32| {
        let text = format!(
            "{method} sip:bob@127.0.0.1:5080 SIP/2.0\r\n\
            Via: SIP/2.0/UDP 127.0.0.1:5070;branch=z9hG4bK{method}{cseq}\r\n\
            From: <sip:alice@127.0.0.1:5070>;tag=a1\r\n\
            To: <sip:bob@127.0.0.1:5080>;tag=b1\r\n\
            Call-ID: unknown-call\r\n\
            CSeq: {cseq} {method}\r\n\
            Content-Length: 0\r\n\r\n"
        );

        Message::parse(text.as_bytes()).unwrap()
    };

    bob.receive(
        vec![request("BYE", 5), request("OPTIONS", 6), request("ACK", 7)],
        alice.addr,
    );

    assert_eq!(codes(&bob.outgoing()), [481, 200]);
    assert!(bob.events().is_empty());
    assert!(alice.outgoing().is_empty());
}

#[tokio::test(start_paused = true)]
async fn invite_without_from_tag_is_rejected() {
    let (alice, mut bob) = alice_and_bob();

    let text = "INVITE sip:bob@127.0.0.1:5080 SIP/2.0\r\n\
        Via: SIP/2.0/UDP 127.0.0.1:5070;branch=z9hG4bKnotag\r\n\
        From: <sip:alice@127.0.0.1:5070>\r\n\
        To: <sip:bob@127.0.0.1:5080>\r\n\
        Call-ID: no-tag\r\n\
        CSeq: 1 INVITE\r\n\
        Content-Length: 0\r\n\r\n";

    bob.receive(vec![Message::parse(text.as_bytes()).unwrap()], alice.addr);

    assert_eq!(codes(&bob.outgoing()), [400]);
    assert!(bob.transactions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn descriptions_are_exchanged() {
    let mut alice = Peer::with_negotiator(
        "alice",
        "127.0.0.1:5070",
        SipConfig::default(),
        FixedSdp::new("v=0 offer", None),
    );
    let mut bob = Peer::with_negotiator(
        "bob",
        "127.0.0.1:5080",
        SipConfig {
            auto_accept: true,
            ..SipConfig::default()
        },
        FixedSdp::new("", Some("v=0 answer")),
    );

    let session = alice.transactions.start_call(bob.uri("bob")).unwrap();

    let sent = deliver(&mut alice, &mut bob);
    let invite = requests(&sent)[0];
    assert_eq!(invite.headers.content_type, Some(ContentType::sdp()));
    assert_eq!(invite.body, "v=0 offer");

    let sent = deliver(&mut bob, &mut alice);
    assert_eq!(codes(&sent), [180, 200]);

    assert!(alice.events().contains(&SipEvent::CallNegotiated {
        session,
        local: Bytes::from_static(b"v=0 offer"),
        remote: Bytes::from_static(b"v=0 answer"),
    }));

    deliver(&mut alice, &mut bob);

    assert!(bob.events().iter().any(|event| matches!(
        event,
        SipEvent::CallNegotiated { local, remote, .. }
            if local == "v=0 answer" && remote == "v=0 offer"
    )));
}

#[tokio::test(start_paused = true)]
async fn unacceptable_offer() {
    let mut alice = Peer::new("alice", "127.0.0.1:5070", SipConfig::default());
    let mut bob = Peer::with_negotiator(
        "bob",
        "127.0.0.1:5080",
        SipConfig::default(),
        FixedSdp::new("", None),
    );

    let session = alice.transactions.start_call(bob.uri("bob")).unwrap();
    deliver(&mut alice, &mut bob);

    let bob_session = bob.transactions.sessions().next().unwrap();
    bob.transactions.accept_call(bob_session).unwrap();

    assert!(bob.events().contains(&SipEvent::CallNegotiationFailed {
        session: bob_session
    }));
    assert!(bob.transactions.is_empty());

    let sent = deliver(&mut bob, &mut alice);
    assert_eq!(codes(&sent), [180, 488]);
    assert!(alice
        .events()
        .contains(&SipEvent::CallNegotiationFailed { session }));
    assert!(alice.transactions.is_empty());
}
