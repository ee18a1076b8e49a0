//! Unified error type for the racetrack server.

use racetrack_protocol::ProtocolError;
use racetrack_race::RaceError;
use racetrack_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` conversions let `?` lift sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum RacetrackError {
    /// Socket-level failure (bind, accept, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Startup configuration is incomplete or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Race control refused or is gone.
    #[error(transparent)]
    Race(#[from] RaceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: RacetrackError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, RacetrackError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: RacetrackError = ProtocolError::UnknownEvent("fly".into()).into();
        assert!(matches!(err, RacetrackError::Protocol(_)));
    }

    #[test]
    fn test_from_config_error() {
        let err: RacetrackError = ConfigError::MissingKeys(vec!["SAFETY_KEY"]).into();
        assert!(matches!(err, RacetrackError::Config(_)));
        assert!(err.to_string().contains("SAFETY_KEY"));
    }

    #[test]
    fn test_from_race_error() {
        let err: RacetrackError = RaceError::Unavailable.into();
        assert!(matches!(err, RacetrackError::Race(RaceError::Unavailable)));
    }
}
