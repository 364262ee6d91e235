//! Conveyor Fabric - In-process queue and envelope layer
//!
//! Provides an asynchronous FIFO queue with flushable sessions, and the
//! request/response adapters that carry typed values across it as
//! [`Message`] envelopes.
//!
//! # Example
//!
//! ```no_run
//! use conveyor_core::{Anomaly, Fault};
//! use conveyor_fabric::{InputResponseQueue, Message, OutputResponseQueue};
//! use futures::{stream, StreamExt};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Producer side: values followed by a domain failure
//! let source = stream::iter(vec![
//!     Ok("partial".to_string()),
//!     Err(Fault::from(Anomaly::new("Quota exhausted").with("limit", 10_i64))),
//! ]);
//! let output = OutputResponseQueue::from_stream(source);
//!
//! // Consumer side: decode the envelopes back into values
//! let input = InputResponseQueue::from_stream(
//!     output
//!         .into_stream()
//!         .map(|message| message.unwrap_or_else(Message::from)),
//! );
//! match input.dequeue_all().await {
//!     Ok(values) => println!("received {values:?}"),
//!     Err(incomplete) => println!("{} values, then {}", incomplete.received.len(), incomplete.error),
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod message;
pub mod oneshot;
pub mod queue;
pub mod request;
pub mod response;

// Re-exports for convenience
pub use error::{Error, Incomplete, Result};
pub use message::{Message, MessageKind};
pub use oneshot::OneShot;
pub use queue::{session, AsyncQueue, Dequeue, QueueBuilder, QueueConfig};
pub use request::{InputRequestQueue, OutputRequestQueue};
pub use response::{InputResponseQueue, OutputResponseQueue, StreamState};
