use super::*;

fn error_text(config: &WaypointConfig) -> String {
    match validate(config) {
        Err(ConfigError::ValidationError(msg)) => msg,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn default_config_is_valid() {
    assert!(validate(&WaypointConfig::default()).is_ok());
}

#[test]
fn empty_channel_name_is_rejected() {
    let mut config = WaypointConfig::default();
    config.channel.name = String::new();
    assert!(error_text(&config).contains("channel.name"));
}

#[test]
fn channel_name_with_spaces_is_rejected() {
    let mut config = WaypointConfig::default();
    config.channel.name = "ride 01".into();
    assert!(error_text(&config).contains("invalid character"));
}

#[test]
fn http_endpoint_is_rejected() {
    let mut config = WaypointConfig::default();
    config.realtime.endpoint = "http://example.com".into();
    assert!(error_text(&config).contains("realtime.endpoint"));
}

#[test]
fn heartbeat_out_of_range() {
    let mut config = WaypointConfig::default();
    config.realtime.heartbeat_interval = 1;
    assert!(error_text(&config).contains("realtime.heartbeat_interval = 1"));
}

#[test]
fn reconnect_max_below_base() {
    let mut config = WaypointConfig::default();
    config.realtime.reconnect.base_delay = 10;
    config.realtime.reconnect.max_delay = 5;
    assert!(error_text(&config).contains("below base_delay"));
}

#[test]
fn negative_distance_interval() {
    let mut config = WaypointConfig::default();
    config.tracker.distance_interval = -1.0;
    assert!(error_text(&config).contains("tracker.distance_interval"));
}

#[test]
fn bad_relay_bind() {
    let mut config = WaypointConfig::default();
    config.relay.bind = "localhost".into();
    assert!(error_text(&config).contains("relay.bind"));
}

#[test]
fn multiple_errors_are_collected() {
    let mut config = WaypointConfig::default();
    config.channel.name = String::new();
    config.realtime.ack_timeout = 0;
    config.tracker.time_interval_ms = 1;
    let msg = error_text(&config);
    assert!(msg.contains("channel.name"));
    assert!(msg.contains("realtime.ack_timeout"));
    assert!(msg.contains("tracker.time_interval_ms"));
    assert_eq!(msg.matches("; ").count(), 2);
}
