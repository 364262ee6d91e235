use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::oneshot::OneShot;
use crate::queue::{session, Dequeue, QueueConfig};

/// Asynchronous FIFO queue with flushable sessions
///
/// `enqueue` and `flush` never wait; a full queue rejects the append instead.
/// Consumers suspend in `dequeue` until a slot is available. A flush ends the
/// current session without closing the queue, so the next append starts a new
/// one.
///
/// The queue is a handle: clones share the same slots.
pub struct AsyncQueue<T> {
    shared: Arc<Mutex<State<T>>>,
}

struct State<T> {
    slots: VecDeque<Slot<T>>,
    ready: OneShot<()>,
    config: QueueConfig,
}

struct Slot<T> {
    filled: OneShot<()>,
    item: Item<T>,
}

enum Item<T> {
    Value(T),
    End,
}

impl<T> AsyncQueue<T> {
    /// Create an empty, unbounded queue
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Create an empty queue with the given limits
    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            shared: Arc::new(Mutex::new(State {
                slots: VecDeque::new(),
                ready: OneShot::new(),
                config,
            })),
        }
    }

    /// Create a builder for configuring the queue
    pub fn builder() -> QueueBuilder<T> {
        QueueBuilder::new()
    }

    /// Append a value to the current session
    pub fn enqueue(&self, value: T) -> Result<()> {
        self.append([Item::Value(value)])
    }

    /// End the current session
    pub fn flush(&self) -> Result<()> {
        self.append([Item::End])?;
        debug!("Session flushed");
        Ok(())
    }

    /// Append a final value and end the session in one step
    ///
    /// Either both slots are appended or, if they do not fit, neither is.
    pub fn enqueue_and_flush(&self, value: T) -> Result<()> {
        self.append([Item::Value(value), Item::End])?;
        debug!("Session flushed");
        Ok(())
    }

    /// Number of undelivered slots, end markers included
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    /// Whether no slot is waiting to be delivered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of consumers suspended waiting for a slot
    pub fn waiting(&self) -> usize {
        self.lock().ready.waiters()
    }

    /// Current limits
    pub fn config(&self) -> QueueConfig {
        self.lock().config
    }

    /// Maximum number of undelivered slots, zero when unbounded
    pub fn max_size(&self) -> usize {
        self.lock().config.max_size
    }

    /// Bound the number of undelivered slots. Zero removes the bound.
    pub fn set_max_size(&self, max_size: usize) {
        self.lock().config.max_size = max_size;
    }

    /// Maximum dequeue wait, zero when unlimited
    pub fn max_wait_time(&self) -> Duration {
        self.lock().config.max_wait_time
    }

    /// Bound how long a dequeue waits for a slot. Zero waits indefinitely.
    pub fn set_max_wait_time(&self, max_wait_time: Duration) {
        self.lock().config.max_wait_time = max_wait_time;
    }

    fn append<const N: usize>(&self, items: [Item<T>; N]) -> Result<()> {
        let ready = {
            let mut state = self.lock();
            let max_size = state.config.max_size;
            if state.config.is_bounded() && state.slots.len() + N > max_size {
                warn!(max_size, "Rejecting append to full queue");
                return Err(Error::CapacityExceeded { max_size });
            }

            state.slots.extend(items.into_iter().map(|item| Slot {
                filled: OneShot::settled(()),
                item,
            }));
            std::mem::take(&mut state.ready)
        };

        ready.settle(());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send> AsyncQueue<T> {
    /// Lazily dequeue the current session
    pub fn stream(&self) -> impl Stream<Item = Result<T>> + Send + '_ {
        session(self)
    }

    /// Lazily dequeue the current session, taking ownership of the handle
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send {
        session(self)
    }
}

impl<T: Send + 'static> AsyncQueue<T> {
    /// Create a queue fed by `source`
    ///
    /// A background task enqueues every item and flushes once the source is
    /// exhausted. Must be called from within a tokio runtime.
    pub fn from_stream<S>(source: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        let queue = Self::new();
        queue.drain(source);
        queue
    }

    fn drain<S>(&self, source: S)
    where
        S: Stream<Item = T> + Send + 'static,
    {
        let queue = self.clone();
        tokio::spawn(async move {
            futures::pin_mut!(source);
            while let Some(value) = source.next().await {
                if let Err(err) = queue.enqueue(value) {
                    warn!(%err, "Stopping source drain");
                    return;
                }
            }

            match queue.flush() {
                Ok(()) => debug!("Source drained"),
                Err(err) => warn!(%err, "Failed to flush drained source"),
            }
        });
    }
}

#[async_trait::async_trait]
impl<T: Send> Dequeue for AsyncQueue<T> {
    type Item = T;

    async fn dequeue(&self) -> Result<T> {
        loop {
            let (slot, ready, config) = {
                let mut state = self.lock();
                let slot = state.slots.pop_front();
                (slot, state.ready.clone(), state.config)
            };

            if let Some(slot) = slot {
                slot.filled.wait().await?;
                return match slot.item {
                    Item::Value(value) => Ok(value),
                    Item::End => Err(Error::EndOfSession),
                };
            }

            match config.wait_limit() {
                Some(limit) => match tokio::time::timeout(limit, ready.wait()).await {
                    Ok(signalled) => signalled?,
                    Err(_) => {
                        debug!(?limit, "Dequeue wait timed out");
                        return Err(Error::Timeout(limit));
                    }
                },
                None => ready.wait().await?,
            }
        }
    }
}

impl<T> Default for AsyncQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for AsyncQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Builder for configuring an [`AsyncQueue`]
pub struct QueueBuilder<T> {
    config: QueueConfig,
    _item: PhantomData<fn() -> T>,
}

impl<T> QueueBuilder<T> {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: QueueConfig::default(),
            _item: PhantomData,
        }
    }

    /// Set the maximum number of undelivered slots
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.config.max_size = max_size;
        self
    }

    /// Set the maximum dequeue wait
    pub fn max_wait_time(mut self, max_wait_time: Duration) -> Self {
        self.config.max_wait_time = max_wait_time;
        self
    }

    /// Build an empty queue
    pub fn build(self) -> AsyncQueue<T> {
        AsyncQueue::with_config(self.config)
    }
}

impl<T: Send + 'static> QueueBuilder<T> {
    /// Build a queue fed by `source`
    pub fn build_from_stream<S>(self, source: S) -> AsyncQueue<T>
    where
        S: Stream<Item = T> + Send + 'static,
    {
        let queue = AsyncQueue::with_config(self.config);
        queue.drain(source);
        queue
    }
}

impl<T> Default for QueueBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for QueueBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueBuilder")
            .field("config", &self.config)
            .finish()
    }
}
