use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits applied by an [`AsyncQueue`](super::AsyncQueue)
///
/// Zero disables either limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of undelivered slots
    pub max_size: usize,

    /// Maximum time a dequeue waits for a slot
    pub max_wait_time: Duration,
}

impl QueueConfig {
    /// Whether a capacity bound applies
    pub fn is_bounded(&self) -> bool {
        self.max_size > 0
    }

    /// The dequeue wait bound, if any
    pub fn wait_limit(&self) -> Option<Duration> {
        (!self.max_wait_time.is_zero()).then_some(self.max_wait_time)
    }
}
