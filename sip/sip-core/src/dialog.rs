//! Identity and ordering state of a single call

use crate::config::SipConfig;
use crate::error::DialogError;
use crate::util::{CALL_ID_LEN, TAG_LEN, random_sequence_number, random_string};
use bytesstr::BytesStr;
use sip_types::header::typed::{CSeq, CallID, Contact, FromTo, Route, Via};
use sip_types::uri::{NameAddr, SipUri};
use sip_types::{Headers, Method, Request, Response};

const MAX_FORWARDS: u32 = 70;

/// Dialog state of one call
///
/// Holds everything needed to build requests inside the dialog and to
/// decide whether an incoming message belongs to it.
#[derive(Debug)]
pub struct DialogState {
    call_id: CallID,

    local_tag: BytesStr,
    remote_tag: Option<BytesStr>,

    local_uri: NameAddr,
    remote_uri: NameAddr,

    /// Request-URI of requests we send inside the dialog
    remote_target: SipUri,
    local_contact: Contact,

    local_cseq: u32,
    remote_cseq: Option<u32>,

    route_set: Vec<Route>,

    negotiated: bool,
}

impl DialogState {
    /// Create the dialog of an outgoing call
    ///
    /// If `registered` is set and a registrar is configured the local
    /// identity is `username@registrar`, otherwise `username@local_address`.
    pub fn create_new_dialog(
        remote_uri: SipUri,
        local_address: &SipUri,
        registered: bool,
        config: &SipConfig,
    ) -> Self {
        let identity = match &config.registrar {
            Some(registrar) if registered => SipUri {
                port: registrar.port,
                ..SipUri::new(registrar.host.clone())
            },
            _ => SipUri {
                port: local_address.port,
                ..SipUri::new(local_address.host.clone())
            },
        }
        .with_user(config.username.as_str());

        let local_uri = NameAddr {
            name: config.display_name.as_deref().map(BytesStr::from),
            uri: identity,
        };

        Self {
            call_id: CallID::new(random_string(CALL_ID_LEN)),
            local_tag: random_string(TAG_LEN),
            remote_tag: None,
            local_uri,
            remote_uri: NameAddr::uri(remote_uri.clone()),
            remote_target: remote_uri,
            local_contact: local_contact(local_address, config),
            local_cseq: config.initial_cseq.unwrap_or_else(random_sequence_number),
            remote_cseq: None,
            route_set: Vec::new(),
            negotiated: false,
        }
    }

    /// Create the dialog of an incoming call
    ///
    /// Our freshly generated tag is written into the To header of `invite`,
    /// so every response built from it carries the tag.
    pub fn create_dialog_from_invite(
        invite: &mut Request,
        local_address: &SipUri,
        config: &SipConfig,
    ) -> Result<Self, DialogError> {
        if invite.line.method != Method::INVITE {
            return Err(DialogError::NotInvite(invite.line.method.clone()));
        }

        let headers = &mut invite.headers;

        let remote_tag = headers
            .from
            .tag
            .clone()
            .ok_or(DialogError::MissingFromTag)?;

        let local_tag = random_string(TAG_LEN);
        headers.to.tag = Some(local_tag.clone());

        let remote_target = match &headers.contact {
            Some(contact) => contact.uri.uri.clone(),
            None => headers.from.uri.uri.clone(),
        };

        Ok(Self {
            call_id: headers.call_id.clone(),
            local_tag,
            remote_tag: Some(remote_tag),
            local_uri: headers.to.uri.clone(),
            remote_uri: headers.from.uri.clone(),
            remote_target,
            local_contact: local_contact(local_address, config),
            local_cseq: config.initial_cseq.unwrap_or_else(random_sequence_number),
            remote_cseq: Some(headers.cseq.cseq),
            route_set: headers.record_route.clone(),
            negotiated: false,
        })
    }

    /// Headers identifying a new request of `method` inside this dialog
    ///
    /// Increments the local CSeq unless the method is ACK or CANCEL, which
    /// reuse the number of the request they belong to.
    pub fn request_dialog_info(&mut self, method: &Method) -> Headers {
        if !method.reuses_cseq() {
            self.local_cseq = self.local_cseq.wrapping_add(1);
        }

        let mut headers = Headers::new(
            FromTo::new(self.local_uri.clone(), Some(self.local_tag.clone())),
            FromTo::new(self.remote_uri.clone(), self.remote_tag.clone()),
            self.call_id.clone(),
            CSeq::new(self.local_cseq, method.clone()),
        );

        headers.max_forwards = Some(MAX_FORWARDS);
        headers.route = self.route_set.clone();

        headers
    }

    /// Build a complete request inside the dialog
    pub fn create_request(&mut self, method: Method, via: Via) -> Request {
        let mut headers = self.request_dialog_info(&method);
        headers.via.push(via);

        if method == Method::INVITE {
            headers.contact = Some(self.local_contact.clone());
        }

        Request::new(method, self.remote_target.clone(), headers)
    }

    /// Check if a request belongs to this dialog
    ///
    /// Call-ID and both tags must match. Except for ACK and CANCEL the CSeq
    /// must be greater than the last one accepted, which is then advanced.
    /// A CANCEL may lack the To tag, as it copies the To of the INVITE.
    pub fn correct_request_dialog(&mut self, headers: &Headers, method: &Method) -> bool {
        if headers.call_id != self.call_id {
            return false;
        }

        if self.remote_tag.is_none() || !headers.from.tag_matches(self.remote_tag.as_ref()) {
            return false;
        }

        let to_tag_ok = match &headers.to.tag {
            Some(tag) => *tag == self.local_tag,
            None => *method == Method::CANCEL,
        };

        if !to_tag_ok {
            return false;
        }

        if method.reuses_cseq() {
            return true;
        }

        let cseq = headers.cseq.cseq;

        if self.remote_cseq.is_some_and(|remote_cseq| cseq <= remote_cseq) {
            log::debug!(
                "dialog {}: rejecting {method} with CSeq {cseq}, already at {:?}",
                self.call_id,
                self.remote_cseq
            );
            return false;
        }

        self.remote_cseq = Some(cseq);
        true
    }

    /// Check if a response answers our latest request inside this dialog
    ///
    /// If the remote tag is not known yet and `record_to_tag` is set, it is
    /// learned from the response's To header.
    pub fn correct_response_dialog(&mut self, headers: &Headers, record_to_tag: bool) -> bool {
        let from_ok = headers.from.tag.as_ref() == Some(&self.local_tag);

        let to_ok = match &self.remote_tag {
            Some(remote_tag) => headers.to.tag.as_ref() == Some(remote_tag),
            None => true,
        };

        let matches = from_ok
            && to_ok
            && headers.call_id == self.call_id
            && headers.cseq.cseq == self.local_cseq;

        if matches && record_to_tag && self.remote_tag.is_none() {
            if let Some(tag) = &headers.to.tag {
                log::debug!("dialog {}: learned remote tag {tag}", self.call_id);
                self.remote_tag = Some(tag.clone());
            }
        }

        matches
    }

    /// Take over remote target and route set from a 2xx to our INVITE
    pub fn confirm(&mut self, response: &Response) {
        if let Some(contact) = &response.headers.contact {
            self.remote_target = contact.uri.uri.clone();
        }

        self.route_set = response.headers.record_route.iter().rev().cloned().collect();
    }

    pub fn call_id(&self) -> &CallID {
        &self.call_id
    }

    pub fn local_tag(&self) -> &BytesStr {
        &self.local_tag
    }

    pub fn remote_tag(&self) -> Option<&BytesStr> {
        self.remote_tag.as_ref()
    }

    pub fn local_cseq(&self) -> u32 {
        self.local_cseq
    }

    pub fn remote_cseq(&self) -> Option<u32> {
        self.remote_cseq
    }

    pub fn remote_uri(&self) -> &NameAddr {
        &self.remote_uri
    }

    pub fn remote_target(&self) -> &SipUri {
        &self.remote_target
    }

    pub fn local_contact(&self) -> &Contact {
        &self.local_contact
    }

    pub fn route_set(&self) -> &[Route] {
        &self.route_set
    }

    pub fn is_negotiated(&self) -> bool {
        self.negotiated
    }

    pub fn set_negotiated(&mut self) {
        self.negotiated = true;
    }
}

fn local_contact(local_address: &SipUri, config: &SipConfig) -> Contact {
    Contact::new(NameAddr::uri(
        SipUri {
            port: local_address.port,
            ..SipUri::new(local_address.host.clone())
        }
        .with_user(config.username.as_str()),
    ))
}
