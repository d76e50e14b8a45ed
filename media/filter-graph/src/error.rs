use crate::unit::DataType;
use std::{fmt, io};

/// Error of a single filter
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("initialization failed: {0}")]
    Init(String),
    #[error("processing failed: {0}")]
    Process(String),
    #[error("cannot handle {0:?} input")]
    UnsupportedType(DataType),
    #[error("filter must be initialized before it is started")]
    NotInitialized,
    #[error("filter was destroyed")]
    Destroyed,
    #[error("failed to spawn worker thread")]
    Spawn(#[source] io::Error),
}

/// Error mutating the graph, the graph stays usable afterwards
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("no conversion from {from:?} to {to:?}")]
    NoConversion { from: DataType, to: DataType },
    #[error("{upstream} outputs {output:?} but {downstream} expects {input:?}")]
    TypeMismatch {
        upstream: String,
        output: DataType,
        downstream: String,
        input: DataType,
    },
    #[error("{direction} of session {session} is already attached")]
    AlreadyAttached { session: u32, direction: Direction },
    #[error("graph has no {0}")]
    NotInitialized(&'static str),
    #[error("session {0} exceeds the configured maximum")]
    SessionOutOfRange(u32),
    #[error("no filter at index {0}")]
    InvalidIndex(usize),
    #[error("filter {filter} failed")]
    FilterInit {
        filter: String,
        #[source]
        source: FilterError,
    },
}

/// One of the four media paths of a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SendVideo,
    ReceiveVideo,
    SendAudio,
    ReceiveAudio,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::SendVideo => "video sending",
            Direction::ReceiveVideo => "video receiving",
            Direction::SendAudio => "audio sending",
            Direction::ReceiveAudio => "audio receiving",
        };

        f.write_str(s)
    }
}
