//! Configuration schema types for Waypoint.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod channel;
mod realtime;
mod relay;
mod system;
mod tracker;

pub use channel::*;
pub use realtime::*;
pub use relay::*;
pub use system::*;
pub use tracker::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Waypoint.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct WaypointConfig {
    pub channel: ChannelConfig,
    pub realtime: RealtimeConfig,
    pub tracker: TrackerConfig,
    pub relay: RelayConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_channel() {
        let config = WaypointConfig::default();
        assert_eq!(config.channel.name, "ride_01");
        assert!(!config.channel.echo_self);
    }

    #[test]
    fn default_realtime() {
        let config = WaypointConfig::default();
        assert_eq!(config.realtime.endpoint, "ws://127.0.0.1:4000/socket");
        assert!(config.realtime.api_key.is_empty());
        assert_eq!(config.realtime.heartbeat_interval, 25);
        assert_eq!(config.realtime.connect_timeout, 15);
        assert_eq!(config.realtime.ack_timeout, 5);
        assert_eq!(config.realtime.max_payload_bytes, 4096);
        assert!(!config.realtime.reconnect.enabled);
    }

    #[test]
    fn default_tracker_matches_watch_settings() {
        let config = WaypointConfig::default();
        assert_eq!(config.tracker.accuracy, Accuracy::High);
        assert_eq!(config.tracker.time_interval_ms, 5000);
        assert_eq!(config.tracker.distance_interval, 5.0);
        assert!(!config.tracker.broadcast_own_position);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml_str = r#"
[channel]
name = "ride_42"

[realtime.reconnect]
enabled = true
"#;
        let config: WaypointConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.channel.name, "ride_42");
        assert!(!config.channel.echo_self);
        assert!(config.realtime.reconnect.enabled);
        assert_eq!(config.realtime.reconnect.max_delay, 30);
        assert_eq!(config.relay.bind, "127.0.0.1:4000");
    }

    #[test]
    fn enums_deserialize_from_toml() {
        let toml_str = r#"
[tracker]
accuracy = "balanced"

[logging]
level = "WARNING"
"#;
        let config: WaypointConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.tracker.accuracy, Accuracy::Balanced);
        assert_eq!(config.logging.level, LogLevel::Warning);
        assert_eq!(config.logging.level.as_directive(), "warn");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = WaypointConfig::default();
        config.realtime.api_key = "super-secret-key".into();
        config.relay.api_keys = vec!["another-secret".into()];
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-key"));
        assert!(!debug.contains("another-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
