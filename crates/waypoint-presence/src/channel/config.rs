//! Presence channel configuration and credential validation.

use std::time::Duration;

use rand::Rng;
use tokio_tungstenite::tungstenite::http::Uri;

use crate::error::ConnectionConfigError;

/// Longest API key accepted before it is treated as malformed.
const MAX_API_KEY_LEN: usize = 1024;

/// Configuration for one presence channel client.
#[derive(Clone)]
pub struct PresenceConfig {
    /// WebSocket endpoint of the real-time service (`ws://` or `wss://`).
    pub endpoint: String,
    /// Service API key.
    pub api_key: String,
    /// Channel name shared by every participant of the session.
    pub channel: String,
    /// Deliver this client's own broadcasts back to its handler.
    pub echo_self: bool,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    /// How long `publish_acked` waits for the service.
    pub ack_timeout: Duration,
    /// Largest encoded broadcast payload the client will send.
    pub max_payload_bytes: usize,
    /// `None` makes a failed connection terminal.
    pub reconnect: Option<ReconnectPolicy>,
}

impl std::fmt::Debug for PresenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("channel", &self.channel)
            .field("echo_self", &self.echo_self)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("connect_timeout", &self.connect_timeout)
            .field("ack_timeout", &self.ack_timeout)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .field("reconnect", &self.reconnect)
            .finish()
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:4000/socket".into(),
            api_key: String::new(),
            channel: String::new(),
            echo_self: false,
            heartbeat_interval: Duration::from_secs(25),
            connect_timeout: Duration::from_secs(15),
            ack_timeout: Duration::from_secs(5),
            max_payload_bytes: 4096,
            reconnect: None,
        }
    }
}

impl PresenceConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            channel: channel.into(),
            ..Default::default()
        }
    }

    /// Check credentials, channel name, endpoint and timing settings.
    pub fn validate(&self) -> Result<(), ConnectionConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConnectionConfigError::MissingApiKey);
        }
        if self.api_key.len() > MAX_API_KEY_LEN {
            return Err(ConnectionConfigError::MalformedApiKey(format!(
                "longer than {MAX_API_KEY_LEN} bytes"
            )));
        }
        if self
            .api_key
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(ConnectionConfigError::MalformedApiKey(
                "contains whitespace or control characters".into(),
            ));
        }

        if let Some(problem) = waypoint_common::channel_name_problem(&self.channel) {
            return Err(ConnectionConfigError::InvalidChannel(problem));
        }

        let invalid = |reason: &str| ConnectionConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: reason.to_string(),
        };
        let uri: Uri = self
            .endpoint
            .parse()
            .map_err(|e| invalid(&format!("{e}")))?;
        match uri.scheme_str() {
            Some("ws") | Some("wss") => {}
            _ => return Err(invalid("scheme must be ws or wss")),
        }
        if uri.host().map_or(true, str::is_empty) {
            return Err(invalid("missing host"));
        }

        let zero = [
            ("heartbeat_interval", self.heartbeat_interval.is_zero()),
            ("connect_timeout", self.connect_timeout.is_zero()),
            ("ack_timeout", self.ack_timeout.is_zero()),
            ("max_payload_bytes", self.max_payload_bytes == 0),
        ];
        if let Some((field, _)) = zero.into_iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConnectionConfigError::ZeroSetting(field));
        }
        Ok(())
    }

    /// Full connection URL including the key and protocol version.
    pub(crate) fn connect_url(&self) -> String {
        let sep = if self.endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}{sep}apikey={}&vsn=1.0.0",
            self.endpoint,
            urlencoding::encode(&self.api_key)
        )
    }
}

/// Exponential backoff between reconnect attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt number `attempt` (0-based): `base * 2^attempt`,
    /// capped at `max_delay`, plus up to 10% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = (delay.as_millis() / 10) as u64;
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PresenceConfig {
        PresenceConfig::new("ws://127.0.0.1:4000/socket", "app.key:secret", "ride_01")
    }

    #[test]
    fn valid_config_passes() {
        assert_eq!(valid().validate(), Ok(()));
        let mut wss = valid();
        wss.endpoint = "wss://rt.example.com/socket".into();
        assert_eq!(wss.validate(), Ok(()));
    }

    #[test]
    fn missing_key() {
        let mut config = valid();
        config.api_key = String::new();
        assert_eq!(config.validate(), Err(ConnectionConfigError::MissingApiKey));
        config.api_key = "   ".into();
        assert_eq!(config.validate(), Err(ConnectionConfigError::MissingApiKey));
    }

    #[test]
    fn malformed_key() {
        let mut config = valid();
        config.api_key = "abc def".into();
        assert!(matches!(
            config.validate(),
            Err(ConnectionConfigError::MalformedApiKey(_))
        ));
        config.api_key = "abc\n".into();
        assert!(matches!(
            config.validate(),
            Err(ConnectionConfigError::MalformedApiKey(_))
        ));
        config.api_key = "k".repeat(MAX_API_KEY_LEN + 1);
        assert!(matches!(
            config.validate(),
            Err(ConnectionConfigError::MalformedApiKey(_))
        ));
    }

    #[test]
    fn bad_channel() {
        let mut config = valid();
        config.channel = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConnectionConfigError::InvalidChannel(_))
        ));
    }

    #[test]
    fn bad_endpoint() {
        for endpoint in ["http://example.com", "", "not a url", "ws:///socket"] {
            let mut config = valid();
            config.endpoint = endpoint.into();
            assert!(
                matches!(
                    config.validate(),
                    Err(ConnectionConfigError::InvalidEndpoint { .. })
                ),
                "{endpoint:?} should be rejected"
            );
        }
    }

    #[test]
    fn zero_timings_are_rejected() {
        let mut config = valid();
        config.heartbeat_interval = Duration::ZERO;
        assert_eq!(
            config.validate(),
            Err(ConnectionConfigError::ZeroSetting("heartbeat_interval"))
        );

        let mut config = valid();
        config.connect_timeout = Duration::ZERO;
        assert_eq!(
            config.validate(),
            Err(ConnectionConfigError::ZeroSetting("connect_timeout"))
        );

        let mut config = valid();
        config.ack_timeout = Duration::ZERO;
        assert_eq!(
            config.validate(),
            Err(ConnectionConfigError::ZeroSetting("ack_timeout"))
        );

        let mut config = valid();
        config.max_payload_bytes = 0;
        assert_eq!(
            config.validate(),
            Err(ConnectionConfigError::ZeroSetting("max_payload_bytes"))
        );

        let mut config = valid();
        config.heartbeat_interval = Duration::from_millis(1);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn connect_url_encodes_key() {
        let mut config = valid();
        config.api_key = "a.b:c/d".into();
        assert_eq!(
            config.connect_url(),
            "ws://127.0.0.1:4000/socket?apikey=a.b%3Ac%2Fd&vsn=1.0.0"
        );
        config.endpoint = "ws://host/socket?tenant=x".into();
        assert!(config.connect_url().starts_with("ws://host/socket?tenant=x&apikey="));
    }

    #[test]
    fn debug_redacts_key() {
        let debug = format!("{:?}", valid());
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        };
        let within = |d: Duration, lo: u64| {
            d >= Duration::from_millis(lo) && d <= Duration::from_millis(lo + lo / 10)
        };
        assert!(within(policy.delay_for(0), 1000));
        assert!(within(policy.delay_for(1), 2000));
        assert!(within(policy.delay_for(2), 4000));
        assert!(within(policy.delay_for(3), 8000));
        assert!(within(policy.delay_for(10), 8000));
        assert!(within(policy.delay_for(u32::MAX), 8000));
    }
}
