use futures::stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::message::Message;
use crate::queue::{session, AsyncQueue, Dequeue};

/// Sending side of a request stream
///
/// Values are wrapped as [`Message::Value`]. Request streams carry no `End`
/// envelope; the session boundary set by [`flush`](Self::flush) is the only
/// end marker.
pub struct OutputRequestQueue<T> {
    queue: AsyncQueue<Message<T>>,
}

impl<T> OutputRequestQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: AsyncQueue::new(),
        }
    }

    pub fn enqueue(&self, value: T) -> Result<()> {
        self.queue.enqueue(Message::value(value))
    }

    pub fn flush(&self) -> Result<()> {
        self.queue.flush()
    }
}

impl<T: Send + 'static> OutputRequestQueue<T> {
    /// Create a request queue fed by `source`
    ///
    /// The source is drained in the background. The session is left open;
    /// the caller decides when to flush.
    pub fn from_stream<S>(source: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        let output = Self::new();
        let queue = output.queue.clone();
        tokio::spawn(async move {
            futures::pin_mut!(source);
            while let Some(value) = source.next().await {
                if let Err(err) = queue.enqueue(Message::value(value)) {
                    warn!(%err, "Stopping request drain");
                    return;
                }
            }
            debug!("Request source drained");
        });
        output
    }

    pub fn stream(&self) -> impl Stream<Item = Result<Message<T>>> + Send + '_ {
        session(self)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Message<T>>> + Send {
        session(self)
    }
}

impl<T> Default for OutputRequestQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<T: Send> Dequeue for OutputRequestQueue<T> {
    type Item = Message<T>;

    async fn dequeue(&self) -> Result<Message<T>> {
        self.queue.dequeue().await
    }
}

/// Receiving side of a request stream
///
/// Accepts envelopes and hands out their payloads. Only
/// [`Message::Value`] is valid here.
pub struct InputRequestQueue<T> {
    queue: AsyncQueue<Message<T>>,
}

impl<T> InputRequestQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: AsyncQueue::new(),
        }
    }

    pub fn enqueue(&self, message: Message<T>) -> Result<()> {
        self.queue.enqueue(message)
    }

    pub fn flush(&self) -> Result<()> {
        self.queue.flush()
    }
}

impl<T: Send + 'static> InputRequestQueue<T> {
    /// Create a request queue fed by `source`
    ///
    /// The source is drained in the background. The session is left open;
    /// the caller decides when to flush.
    pub fn from_stream<S>(source: S) -> Self
    where
        S: Stream<Item = Message<T>> + Send + 'static,
    {
        let input = Self::new();
        let queue = input.queue.clone();
        tokio::spawn(async move {
            futures::pin_mut!(source);
            while let Some(message) = source.next().await {
                if let Err(err) = queue.enqueue(message) {
                    warn!(%err, "Stopping request drain");
                    return;
                }
            }
            debug!("Request source drained");
        });
        input
    }

    pub fn stream(&self) -> impl Stream<Item = Result<T>> + Send + '_ {
        session(self)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send {
        session(self)
    }
}

impl<T> Default for InputRequestQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<T: Send> Dequeue for InputRequestQueue<T> {
    type Item = T;

    async fn dequeue(&self) -> Result<T> {
        match self.queue.dequeue().await? {
            Message::Value { payload } => Ok(payload),
            other => Err(Error::UnexpectedMessage(other.kind())),
        }
    }
}
