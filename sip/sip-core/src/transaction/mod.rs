//! Client and server transactions of a dialog
//!
//! Both sides are plain state machines. They never send anything
//! themselves, instead they hand out the messages to send and report
//! their outcome to the [`Transactions`](crate::Transactions) manager.

mod client;
mod server;

pub use client::{ClientOutcome, ClientTimer, ClientTransaction};
pub use server::{ServerTimer, ServerTransaction};

pub(crate) use server::Answered;
