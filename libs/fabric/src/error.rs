use std::time::Duration;

use conveyor_core::Anomaly;
use thiserror::Error;

use crate::message::MessageKind;
use crate::response::StreamState;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Queue capacity exceeded: max size is {max_size}")]
    CapacityExceeded { max_size: usize },

    #[error("Timed out after {0:?} waiting for a value")]
    Timeout(Duration),

    /// Marks the end of the current session; streams end silently on it
    #[error("End of session")]
    EndOfSession,

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Anomaly(#[from] Anomaly),

    #[error("Unexpected {0} message")]
    UnexpectedMessage(MessageKind),

    #[error("Response stream already {0}")]
    Closed(StreamState),

    #[error("Codec error: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A drain that stopped on a failure before the stream ended
///
/// Values received before the failure are kept in `received`.
#[derive(Error, Debug)]
#[error("Stream failed after {} values: {error}", .received.len())]
pub struct Incomplete<T> {
    pub received: Vec<T>,
    #[source]
    pub error: Error,
}

impl<T> Incomplete<T> {
    pub fn into_error(self) -> Error {
        self.error
    }
}
