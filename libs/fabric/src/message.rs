use std::fmt;

use conveyor_core::{Anomaly, AnomalyData, Fault};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Envelope carried by request and response streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message<T> {
    /// A produced value
    #[serde(rename = "value")]
    Value { payload: T },

    /// Graceful end of a response stream
    #[serde(rename = "end")]
    End,

    /// Opaque producer fault
    #[serde(rename = "err")]
    InternalError { message: String },

    /// Domain failure with structured data
    #[serde(rename = "an")]
    Anomaly {
        message: String,
        #[serde(default)]
        data: AnomalyData,
    },
}

impl<T> Message<T> {
    pub fn value(payload: T) -> Self {
        Self::Value { payload }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    pub fn anomaly(anomaly: Anomaly) -> Self {
        Self::Anomaly {
            message: anomaly.message,
            data: anomaly.data,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Value { .. } => MessageKind::Value,
            Self::End => MessageKind::End,
            Self::InternalError { .. } => MessageKind::InternalError,
            Self::Anomaly { .. } => MessageKind::Anomaly,
        }
    }

    /// Whether no further message follows this one in a response stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Value { .. })
    }
}

impl<T> From<Fault> for Message<T> {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::Anomaly(anomaly) => Self::anomaly(anomaly),
            other => Self::internal_error(other.to_string()),
        }
    }
}

impl<T> From<Error> for Message<T> {
    fn from(error: Error) -> Self {
        match error {
            Error::Anomaly(anomaly) => Self::anomaly(anomaly),
            other => Self::internal_error(other.to_string()),
        }
    }
}

/// Discriminator of a [`Message`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Value,
    End,
    InternalError,
    Anomaly,
}

impl MessageKind {
    /// Wire tag of the variant
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::End => "end",
            Self::InternalError => "err",
            Self::Anomaly => "an",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
