use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;

pub mod bincode;

pub use self::bincode::BincodeCodec;

/// Codec trait for serializing and deserializing envelopes
pub trait Codec: Send + Sync {
    /// Encode an envelope into bytes
    fn encode<T: Serialize>(&self, message: &Message<T>) -> Result<Vec<u8>>;

    /// Decode bytes into an envelope
    fn decode<T: for<'de> Deserialize<'de>>(&self, bytes: &[u8]) -> Result<Message<T>>;
}
