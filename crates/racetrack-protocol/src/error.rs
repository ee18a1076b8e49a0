//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes were not a well-formed event frame.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame named an event this server does not handle.
    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    /// The event name was valid but its payload did not match.
    #[error("invalid payload for `{event}`: {source}")]
    InvalidPayload {
        /// Event whose payload was rejected.
        event: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A value inside an otherwise valid payload is not recognized.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}
