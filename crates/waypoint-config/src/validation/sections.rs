//! Validation for each config section.

use crate::schema::WaypointConfig;

use super::helpers::{validate_range, validate_range_f64};

/// Validate the channel name.
pub(crate) fn validate_channel(errors: &mut Vec<String>, config: &WaypointConfig) {
    if let Some(problem) = waypoint_common::channel_name_problem(&config.channel.name) {
        errors.push(format!("channel.name: {problem}"));
    }
}

/// Validate realtime connection settings.
pub(crate) fn validate_realtime(errors: &mut Vec<String>, config: &WaypointConfig) {
    let rt = &config.realtime;
    if !(rt.endpoint.starts_with("ws://") || rt.endpoint.starts_with("wss://")) {
        errors.push(format!(
            "realtime.endpoint = {:?} must start with ws:// or wss://",
            rt.endpoint
        ));
    }
    validate_range(errors, "realtime.heartbeat_interval", rt.heartbeat_interval, 5, 300);
    validate_range(errors, "realtime.connect_timeout", rt.connect_timeout, 1, 120);
    validate_range(errors, "realtime.ack_timeout", rt.ack_timeout, 1, 60);
    validate_range(
        errors,
        "realtime.max_payload_bytes",
        rt.max_payload_bytes,
        256,
        65536,
    );
    validate_range(
        errors,
        "realtime.reconnect.base_delay",
        rt.reconnect.base_delay,
        1,
        60,
    );
    validate_range(
        errors,
        "realtime.reconnect.max_delay",
        rt.reconnect.max_delay,
        1,
        3600,
    );
    if rt.reconnect.max_delay < rt.reconnect.base_delay {
        errors.push(format!(
            "realtime.reconnect.max_delay = {} is below base_delay = {}",
            rt.reconnect.max_delay, rt.reconnect.base_delay
        ));
    }
}

/// Validate location tracking settings.
pub(crate) fn validate_tracker(errors: &mut Vec<String>, config: &WaypointConfig) {
    validate_range(
        errors,
        "tracker.time_interval_ms",
        config.tracker.time_interval_ms,
        100,
        3_600_000,
    );
    validate_range_f64(
        errors,
        "tracker.distance_interval",
        config.tracker.distance_interval,
        0.0,
        10_000.0,
    );
}

/// Validate relay settings.
pub(crate) fn validate_relay(errors: &mut Vec<String>, config: &WaypointConfig) {
    if config.relay.bind.parse::<std::net::SocketAddr>().is_err() {
        errors.push(format!(
            "relay.bind = {:?} is not a socket address",
            config.relay.bind
        ));
    }
    validate_range(
        errors,
        "relay.max_payload_bytes",
        config.relay.max_payload_bytes,
        256,
        65536,
    );
    if config.relay.api_keys.iter().any(|k| k.trim().is_empty()) {
        errors.push("relay.api_keys contains an empty key".into());
    }
}
