use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::message::Message;

/// Bincode codec for compact binary envelopes
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn encode<T: Serialize>(&self, message: &Message<T>) -> Result<Vec<u8>> {
        bincode::serialize(message).map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self, bytes: &[u8]) -> Result<Message<T>> {
        bincode::deserialize(bytes).map_err(|e| Error::Codec(e.to_string()))
    }
}
