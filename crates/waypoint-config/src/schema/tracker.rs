//! Location tracking configuration types.

use serde::{Deserialize, Serialize};

/// Requested fix accuracy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Accuracy {
    Low,
    Balanced,
    #[default]
    High,
}

/// Location tracking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub accuracy: Accuracy,
    /// Minimum spacing between forwarded samples, in milliseconds.
    pub time_interval_ms: u32,
    /// Minimum movement between forwarded samples, in metres.
    pub distance_interval: f64,
    /// Publish every tracked position, not only dropped pins.
    pub broadcast_own_position: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::High,
            time_interval_ms: 5000,
            distance_interval: 5.0,
            broadcast_own_position: false,
        }
    }
}
