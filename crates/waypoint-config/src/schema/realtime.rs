//! Real-time service connection settings.

use serde::{Deserialize, Serialize};

/// How to reach the real-time messaging service.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// WebSocket endpoint, `ws://` or `wss://`.
    pub endpoint: String,
    /// Service API key. Leave empty and set `WAYPOINT_API_KEY` instead.
    pub api_key: String,
    /// Heartbeat interval in seconds (valid range: 5-300).
    pub heartbeat_interval: u32,
    /// Connection attempt timeout in seconds (valid range: 1-120).
    pub connect_timeout: u32,
    /// How long an acknowledged publish waits for the service, in seconds.
    pub ack_timeout: u32,
    /// Largest encoded broadcast the client will send.
    pub max_payload_bytes: u32,
    pub reconnect: ReconnectConfig,
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("connect_timeout", &self.connect_timeout)
            .field("ack_timeout", &self.ack_timeout)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .field("reconnect", &self.reconnect)
            .finish()
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:4000/socket".into(),
            api_key: String::new(),
            heartbeat_interval: 25,
            connect_timeout: 15,
            ack_timeout: 5,
            max_payload_bytes: 4096,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Automatic reconnect policy. Disabled by default: a failed connection
/// stays failed until the client is recreated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    /// Base delay in seconds, doubled after every failed attempt.
    pub base_delay: u32,
    /// Upper bound on the delay in seconds.
    pub max_delay: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_delay: 1,
            max_delay: 30,
        }
    }
}
