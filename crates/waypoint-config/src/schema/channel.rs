use serde::{Deserialize, Serialize};

/// The shared channel that scopes one logical session (e.g. one ride).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub name: String,
    /// Deliver this client's own broadcasts back to it.
    pub echo_self: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "ride_01".into(),
            echo_self: false,
        }
    }
}
