use std::fmt;

use crate::error::ConnectionFailedError;

/// Connection lifecycle.
///
/// `Initializing → Connected → {Failed, Closed}`. `Failed` is terminal
/// unless a reconnect policy is configured; `Closed` is always terminal and
/// only reached through `dispose`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Initializing,
    Connected,
    Failed(ConnectionFailedError),
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Initializing => "initializing",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed(_) => "failed",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Failed(e) => write!(f, "failed: {e}"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_display() {
        assert_eq!(ConnectionState::Initializing.to_string(), "initializing");
        assert_eq!(ConnectionState::Closed.name(), "closed");
        let failed = ConnectionState::Failed(ConnectionFailedError::Transport("reset".into()));
        assert_eq!(failed.name(), "failed");
        assert_eq!(failed.to_string(), "failed: transport error: reset");
    }

    #[test]
    fn only_connected_is_connected() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Initializing.is_connected());
        assert!(!ConnectionState::Closed.is_connected());
    }
}
