//! Media pipeline of peer to peer calls
//!
//! Every [`Filter`] owns a bounded input queue and a worker thread running
//! its [`Stage`]. Units are handed downstream by value, fanning out to
//! several filters copies them. A full queue drops the newest unit instead
//! of blocking the producer.
//!
//! [`FilterGraph`] builds the shared local capture graph and a send and
//! receive path per peer, inserting pixel format conversions where adjacent
//! filters disagree.
//!
//! Sources have the input type [`DataType::None`]; capture devices and the
//! network layer push units into them with [`Filter::put_input`].

mod config;
pub mod convert;
mod error;
mod event;
mod filter;
mod graph;
mod unit;

pub use config::GraphConfig;
pub use error::{Direction, FilterError, GraphError};
pub use event::GraphEvent;
pub use filter::{Filter, FilterStats, Stage};
pub use graph::{Chain, FilterFactory, FilterGraph};
pub use unit::{DataType, MediaUnit, Source};
