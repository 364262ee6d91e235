use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use conveyor_core::{Anomaly, Fault};
use futures::stream::{Stream, StreamExt};
use futures::TryStreamExt;
use tracing::{debug, warn};

use crate::error::{Error, Incomplete, Result};
use crate::message::Message;
use crate::queue::{session, AsyncQueue, Dequeue};

/// Lifecycle of a response stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    Streaming,
    Ended,
    Failed,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Streaming)
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Streaming => "streaming",
            Self::Ended => "ended",
            Self::Failed => "failed",
        })
    }
}

/// Sending side of a response stream
///
/// Every response ends with exactly one terminal envelope: `End` after a
/// [`flush`](Self::flush), or an error envelope after a
/// [`fail`](Self::fail). The underlying session is flushed right after it.
pub struct OutputResponseQueue<T> {
    queue: AsyncQueue<Message<T>>,
    state: Arc<Mutex<StreamState>>,
}

impl<T> OutputResponseQueue<T> {
    /// Create an open response with an unbounded queue
    pub fn new() -> Self {
        Self {
            queue: AsyncQueue::new(),
            state: Arc::new(Mutex::new(StreamState::Streaming)),
        }
    }

    /// Send one value, failing with [`Error::Closed`] once the response ended
    pub fn enqueue(&self, value: T) -> Result<()> {
        let state = self.lock();
        if state.is_terminal() {
            return Err(Error::Closed(*state));
        }
        self.queue.enqueue(Message::value(value))
    }

    /// End the response gracefully
    ///
    /// The `End` envelope and the session boundary are appended together, so
    /// a full queue leaves the response untouched and still streaming.
    pub fn flush(&self) -> Result<()> {
        let mut state = self.lock();
        if state.is_terminal() {
            return Err(Error::Closed(*state));
        }
        self.queue.enqueue_and_flush(Message::End)?;
        *state = StreamState::Ended;
        Ok(())
    }

    /// End the response with a failure
    ///
    /// An anomaly is sent as [`Message::Anomaly`] with its data, anything
    /// else as [`Message::InternalError`].
    pub fn fail(&self, fault: Fault) -> Result<()> {
        let mut state = self.lock();
        if state.is_terminal() {
            return Err(Error::Closed(*state));
        }
        self.queue.enqueue_and_flush(Message::from(fault))?;
        *state = StreamState::Failed;
        Ok(())
    }

    pub fn state(&self) -> StreamState {
        *self.lock()
    }

    pub fn max_size(&self) -> usize {
        self.queue.max_size()
    }

    pub fn set_max_size(&self, max_size: usize) {
        self.queue.set_max_size(max_size);
    }

    pub fn max_wait_time(&self) -> Duration {
        self.queue.max_wait_time()
    }

    pub fn set_max_wait_time(&self, max_wait_time: Duration) {
        self.queue.set_max_wait_time(max_wait_time);
    }

    fn share(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send + 'static> OutputResponseQueue<T> {
    /// Create a response fed by `source`
    ///
    /// The source is drained in the background. Exhaustion ends the response
    /// gracefully; the first fault ends it with the matching error envelope.
    pub fn from_stream<S>(source: S) -> Self
    where
        S: Stream<Item = std::result::Result<T, Fault>> + Send + 'static,
    {
        let output = Self::new();
        let producer = output.share();
        tokio::spawn(async move {
            futures::pin_mut!(source);
            let outcome = loop {
                match source.next().await {
                    Some(Ok(value)) => {
                        if let Err(err) = producer.enqueue(value) {
                            break Err(err);
                        }
                    }
                    Some(Err(fault)) => {
                        warn!(%fault, "Response source failed");
                        break producer.fail(fault);
                    }
                    None => break producer.flush(),
                }
            };

            match outcome {
                Ok(()) => debug!(state = %producer.state(), "Response source drained"),
                Err(err) => warn!(%err, "Stopping response drain"),
            }
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

impl<T> Default for OutputResponseQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<T: Send> Dequeue for OutputResponseQueue<T> {
    type Item = Message<T>;

    async fn dequeue(&self) -> Result<Message<T>> {
        self.queue.dequeue().await
    }
}

/// Receiving side of a response stream
///
/// Decodes envelopes back into values. `End` finishes the stream cleanly;
/// error envelopes are raised as [`Error::Internal`] or [`Error::Anomaly`].
/// After either, every further dequeue repeats the terminal outcome.
pub struct InputResponseQueue<T> {
    queue: AsyncQueue<Message<T>>,
    phase: Mutex<Phase>,
}

enum Phase {
    Streaming,
    Ended,
    Failed(Error),
}

impl<T> InputResponseQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: AsyncQueue::new(),
            phase: Mutex::new(Phase::Streaming),
        }
    }

    /// Feed one received envelope; envelopes are interpreted on dequeue
    pub fn enqueue(&self, message: Message<T>) -> Result<()> {
        self.queue.enqueue(message)
    }

    /// State as observed by the reader so far
    pub fn state(&self) -> StreamState {
        match *self.lock() {
            Phase::Streaming => StreamState::Streaming,
            Phase::Ended => StreamState::Ended,
            Phase::Failed(_) => StreamState::Failed,
        }
    }

    pub fn max_size(&self) -> usize {
        self.queue.max_size()
    }

    pub fn set_max_size(&self, max_size: usize) {
        self.queue.set_max_size(max_size);
    }

    pub fn max_wait_time(&self) -> Duration {
        self.queue.max_wait_time()
    }

    pub fn set_max_wait_time(&self, max_wait_time: Duration) {
        self.queue.set_max_wait_time(max_wait_time);
    }

    fn terminal_outcome(&self) -> Option<Error> {
        match &*self.lock() {
            Phase::Streaming => None,
            Phase::Ended => Some(Error::EndOfSession),
            Phase::Failed(error) => Some(error.clone()),
        }
    }

    fn finish(&self, phase: Phase) {
        *self.lock() = phase;
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send + 'static> InputResponseQueue<T> {
    /// Create a response reader fed by `source`
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
                    warn!(%err, "Stopping response drain");
                    return;
                }
            }
            debug!("Response source drained");
        });
        input
    }

    pub fn stream(&self) -> impl Stream<Item = Result<T>> + Send + '_ {
        session(self)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send {
        session(self)
    }

    /// Collect every value up to the end of the response
    ///
    /// On failure the values received so far are returned alongside the
    /// error.
    pub async fn dequeue_all(&self) -> std::result::Result<Vec<T>, Incomplete<T>> {
        let mut received = Vec::new();
        let values = self.stream();
        futures::pin_mut!(values);
        while let Some(value) = values.next().await {
            match value {
                Ok(value) => received.push(value),
                Err(error) => return Err(Incomplete { received, error }),
            }
        }
        Ok(received)
    }

    /// Collect every value, discarding partial results on failure
    pub async fn try_dequeue_all(&self) -> Result<Vec<T>> {
        self.stream().try_collect().await
    }
}

impl<T> Default for InputResponseQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<T: Send> Dequeue for InputResponseQueue<T> {
    type Item = T;

    async fn dequeue(&self) -> Result<T> {
        if let Some(outcome) = self.terminal_outcome() {
            return Err(outcome);
        }

        match self.queue.dequeue().await? {
            Message::Value { payload } => Ok(payload),
            Message::End => {
                self.finish(Phase::Ended);
                Err(Error::EndOfSession)
            }
            Message::InternalError { message } => {
                let error = Error::Internal(message);
                self.finish(Phase::Failed(error.clone()));
                Err(error)
            }
            Message::Anomaly { message, data } => {
                let error = Error::Anomaly(Anomaly::with_data(message, data));
                self.finish(Phase::Failed(error.clone()));
                Err(error)
            }
        }
    }
}
