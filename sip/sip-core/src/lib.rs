//! Signaling core of peer to peer calls
//!
//! Implements the dialog and transaction layers needed to place, answer and
//! end calls over SIP/UDP, together with registration at a registrar.
//!
//! [`Transactions`] is a synchronous state machine: it is fed received
//! messages, timer expiries and call control operations and produces
//! messages to send plus [`SipEvent`]s. [`Endpoint`] runs it on top of the
//! UDP transport inside a tokio task.

mod config;
mod context;
mod dialog;
mod endpoint;
mod error;
mod event;
mod manager;
mod negotiator;
mod registration;
mod session;
mod timer;
pub mod transaction;
pub mod transport;
mod util;

pub use config::{SipConfig, TimerConfig};
pub use dialog::DialogState;
pub use endpoint::{Command, Endpoint, EndpointHandle};
pub use error::{DialogError, Error, Result};
pub use event::SipEvent;
pub use manager::{Dialog, Identified, Transactions};
pub use negotiator::{NoNegotiation, Negotiator};
pub use session::{SessionId, SessionIdAllocator};
pub use timer::TimerExpired;
pub use transport::{Destination, Outgoing, ReceivedMessage, Udp};
