//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Waypoint Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[channel]
# One channel per logical session (e.g. per ride). Prefer setting
# WAYPOINT_CHANNEL from whatever provisions the session.
name = "ride_01"
# echo_self = false      # deliver our own broadcasts back to us

[realtime]
# endpoint = "ws://127.0.0.1:4000/socket"
# Do not put a production key here; set WAYPOINT_API_KEY instead.
# api_key = ""
# heartbeat_interval = 25   # 5-300 seconds
# connect_timeout = 15      # 1-120 seconds
# ack_timeout = 5           # 1-60 seconds
# max_payload_bytes = 4096  # 256-65536

[realtime.reconnect]
# enabled = false
# base_delay = 1            # seconds, doubled per attempt
# max_delay = 30

[tracker]
# accuracy = "high"         # low, balanced, high
# time_interval_ms = 5000
# distance_interval = 5.0   # metres
# broadcast_own_position = false

[relay]
# bind = "127.0.0.1:4000"
# api_keys = []             # empty accepts any key
# max_payload_bytes = 4096

[logging]
# level = "INFO"            # TRACE, DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
