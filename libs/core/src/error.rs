use thiserror::Error;

use crate::anomaly::Anomaly;

/// Failure reported by a producer while generating a stream
#[derive(Error, Debug)]
pub enum Fault {
    #[error(transparent)]
    Anomaly(#[from] Anomaly),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde::de::value::Error),

    #[error("{0}")]
    Custom(String),
}

impl Fault {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// The anomaly behind this fault, if it is a domain-level failure
    pub fn as_anomaly(&self) -> Option<&Anomaly> {
        match self {
            Self::Anomaly(anomaly) => Some(anomaly),
            _ => None,
        }
    }
}
