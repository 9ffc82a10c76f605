//! Error types for the presence channel client.

use std::time::Duration;

/// Construction-time failure. Fatal: the client never starts connecting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionConfigError {
    #[error("api key is missing")]
    MissingApiKey,

    #[error("api key is malformed: {0}")]
    MalformedApiKey(String),

    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroSetting(&'static str),

    #[error("presence channel must be created inside a tokio runtime")]
    NoRuntime,
}

/// Why a connection stopped working. Reported through the connection
/// state observer, never returned from a call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionFailedError {
    #[error("service refused credentials: {0}")]
    Unauthorized(String),

    #[error("service rejected channel join: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("channel closed by service: {0}")]
    ChannelClosed(String),

    #[error("client disposed")]
    Disposed,
}

/// A single publish attempt failed. Never retried; the next sample
/// supersedes it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PublishError {
    #[error("not connected (state: {0})")]
    NotConnected(&'static str),

    #[error("client disposed")]
    Disposed,

    #[error("sample is outside valid coordinate bounds: ({latitude}, {longitude})")]
    InvalidSample { latitude: f64, longitude: f64 },

    #[error("payload is {size} bytes, limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("network unavailable: {0}")]
    Unavailable(String),

    #[error("service rejected publish: {0}")]
    Rejected(String),

    #[error("no acknowledgement within {0:?}")]
    Timeout(Duration),

    #[error("failed to encode payload: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        assert_eq!(
            ConnectionConfigError::MissingApiKey.to_string(),
            "api key is missing"
        );
        let err = ConnectionConfigError::InvalidEndpoint {
            endpoint: "http://x".into(),
            reason: "scheme must be ws or wss".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid endpoint \"http://x\": scheme must be ws or wss"
        );
        assert_eq!(
            ConnectionConfigError::ZeroSetting("heartbeat_interval").to_string(),
            "heartbeat_interval must be greater than zero"
        );
    }

    #[test]
    fn publish_error_display() {
        assert_eq!(
            PublishError::NotConnected("initializing").to_string(),
            "not connected (state: initializing)"
        );
        assert_eq!(
            PublishError::PayloadTooLarge {
                size: 5000,
                limit: 4096
            }
            .to_string(),
            "payload is 5000 bytes, limit is 4096"
        );
        assert_eq!(
            PublishError::Timeout(Duration::from_secs(5)).to_string(),
            "no acknowledgement within 5s"
        );
    }

    #[test]
    fn connection_failed_display() {
        assert_eq!(
            ConnectionFailedError::Unauthorized("HTTP 401".into()).to_string(),
            "service refused credentials: HTTP 401"
        );
        assert_eq!(
            ConnectionFailedError::Timeout(Duration::from_millis(1500)).to_string(),
            "timed out after 1.5s"
        );
    }
}
