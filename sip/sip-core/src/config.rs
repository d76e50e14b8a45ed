use sip_types::uri::SipUri;
use std::time::Duration;

/// Timer values, defaults are the ones recommended by RFC 3261
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// RTT estimate, initial retransmit interval
    pub t1: Duration,
    /// Maximum retransmit interval for non-INVITE requests and 2xx responses
    pub t2: Duration,
    /// How long a request may stay unanswered, 64*T1
    pub request_timeout: Duration,
    /// How long an INVITE may keep ringing before it is given up
    pub ringing_timeout: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        let t1 = Duration::from_millis(500);

        Self {
            t1,
            t2: Duration::from_secs(4),
            request_timeout: t1 * 64,
            ringing_timeout: Duration::from_secs(60),
        }
    }
}

/// Configuration of the signaling side
///
/// ```
/// use vcall_sip_core::SipConfig;
///
/// let config = SipConfig {
///     username: "alice".into(),
///     auto_accept: true,
///     ..SipConfig::default()
/// };
///
/// assert_eq!(config.register_expires, 3600);
/// ```
#[derive(Debug, Clone)]
pub struct SipConfig {
    pub username: String,
    pub display_name: Option<String>,

    /// `host[:port]` put into Via, Contact and From, defaults to the bound
    /// address of the transport
    pub local_address: Option<String>,

    /// Server to register at, its host is used as our domain once registered
    pub registrar: Option<SipUri>,

    /// Accept incoming calls without asking call control
    pub auto_accept: bool,

    pub timers: TimerConfig,

    /// Retransmit requests and 2xx responses, required on unreliable transports
    pub retransmit: bool,

    /// Seed of the local CSeq of new dialogs, random if unset.
    /// The first request of a dialog uses the seed plus one.
    pub initial_cseq: Option<u32>,

    /// Requested registration lifetime in seconds
    pub register_expires: u32,

    pub user_agent: Option<String>,
}

impl Default for SipConfig {
    fn default() -> Self {
        Self {
            username: "anonymous".into(),
            display_name: None,
            local_address: None,
            registrar: None,
            auto_accept: false,
            timers: TimerConfig::default(),
            retransmit: true,
            initial_cseq: None,
            register_expires: 3600,
            user_agent: Some(concat!("vcall/", env!("CARGO_PKG_VERSION")).into()),
        }
    }
}
