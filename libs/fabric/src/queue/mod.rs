use futures::stream::{self, Stream};

use crate::error::{Error, Result};

pub mod async_queue;
pub mod config;

pub use self::async_queue::{AsyncQueue, QueueBuilder};
pub use self::config::QueueConfig;

/// Queue-like component that hands out items one at a time
///
/// A call fails with [`Error::EndOfSession`] once the producer has flushed
/// the current session.
#[async_trait::async_trait]
pub trait Dequeue: Send + Sync {
    type Item: Send;

    /// Remove the next item, waiting for one if necessary
    async fn dequeue(&self) -> Result<Self::Item>;
}

#[async_trait::async_trait]
impl<Q: Dequeue + ?Sized> Dequeue for &Q {
    type Item = Q::Item;

    async fn dequeue(&self) -> Result<Self::Item> {
        (**self).dequeue().await
    }
}

/// Lazily dequeue the current session
///
/// The stream ends when the session is flushed. Any other failure is yielded
/// once and ends the stream. Calling this again after the stream ended starts
/// on the next session.
pub fn session<Q: Dequeue>(queue: Q) -> impl Stream<Item = Result<Q::Item>> + Send {
    stream::unfold(Some(queue), |queue| async move {
        let queue = queue?;
        match queue.dequeue().await {
            Ok(item) => Some((Ok(item), Some(queue))),
            Err(Error::EndOfSession) => None,
            Err(err) => Some((Err(err), None)),
        }
    })
}
