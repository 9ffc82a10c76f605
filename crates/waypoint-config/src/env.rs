//! Environment variable overrides.
//!
//! Credentials and per-session channel names come from the environment so
//! they never have to live in a distributed config file.

use crate::schema::WaypointConfig;

pub const API_KEY_VAR: &str = "WAYPOINT_API_KEY";
pub const ENDPOINT_VAR: &str = "WAYPOINT_ENDPOINT";
pub const CHANNEL_VAR: &str = "WAYPOINT_CHANNEL";

/// Apply `WAYPOINT_*` variables from the process environment.
pub fn apply_env_overrides(config: &mut WaypointConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides using `lookup` to resolve variable names. Empty values
/// are ignored.
pub fn apply_overrides_from<F>(config: &mut WaypointConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = get(API_KEY_VAR) {
        tracing::debug!("api key taken from {API_KEY_VAR}");
        config.realtime.api_key = key;
    }
    if let Some(endpoint) = get(ENDPOINT_VAR) {
        tracing::debug!(endpoint = %endpoint, "endpoint taken from {ENDPOINT_VAR}");
        config.realtime.endpoint = endpoint;
    }
    if let Some(channel) = get(CHANNEL_VAR) {
        tracing::debug!(channel = %channel, "channel taken from {CHANNEL_VAR}");
        config.channel.name = channel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn overrides_apply() {
        let mut config = WaypointConfig::default();
        apply_overrides_from(
            &mut config,
            lookup(&[
                (API_KEY_VAR, "k1.k2:secret"),
                (ENDPOINT_VAR, "wss://rt.example.com/socket"),
                (CHANNEL_VAR, "ride_77"),
            ]),
        );
        assert_eq!(config.realtime.api_key, "k1.k2:secret");
        assert_eq!(config.realtime.endpoint, "wss://rt.example.com/socket");
        assert_eq!(config.channel.name, "ride_77");
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut config = WaypointConfig::default();
        config.realtime.api_key = "from-file".into();
        apply_overrides_from(&mut config, lookup(&[(API_KEY_VAR, "  ")]));
        assert_eq!(config.realtime.api_key, "from-file");
        assert_eq!(config.channel.name, "ride_01");
    }
}
