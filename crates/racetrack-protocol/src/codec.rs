//! Codec trait and the JSON implementation.
//!
//! The server only ever speaks JSON to browsers, but the handler is written
//! against [`Codec`] so tests and tools can swap the encoding.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes events to bytes and decodes bytes back into events.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or do not
    /// describe a `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use racetrack_protocol::{Codec, JsonCodec, ServerEvent};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&ServerEvent::TimerTick { remaining: 42_000 }).unwrap();
/// assert_eq!(bytes, br#"{"event":"timer-tick","data":{"remaining":42000}}"#);
///
/// let decoded: ServerEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, ServerEvent::TimerTick { remaining: 42_000 });
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
