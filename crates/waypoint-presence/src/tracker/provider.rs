use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use waypoint_common::PositionSample;

/// Foreground location permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Requested fix quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accuracy {
    Low,
    Balanced,
    #[default]
    High,
}

/// Options for the continuous position watch.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchOptions {
    pub accuracy: Accuracy,
    /// Minimum time between forwarded samples.
    pub time_interval: Duration,
    /// Minimum distance in metres between forwarded samples.
    pub distance_interval: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::High,
            time_interval: Duration::from_millis(5000),
            distance_interval: 5.0,
        }
    }
}

/// Why the tracker could not produce a position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackerError {
    #[error("Location services are disabled. Please enable them in your device settings.")]
    ServicesDisabled,

    #[error("Permission to access location was denied")]
    PermissionDenied,

    #[error("{0}")]
    Unavailable(String),
}

impl TrackerError {
    /// Whether the user can fix this from the device settings.
    pub fn needs_settings(&self) -> bool {
        matches!(
            self,
            TrackerError::ServicesDisabled | TrackerError::PermissionDenied
        )
    }
}

/// Platform location services.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn services_enabled(&self) -> bool;

    async fn permission_status(&self) -> PermissionStatus;

    /// Prompt for foreground permission if it is still undetermined.
    async fn request_permission(&self) -> PermissionStatus;

    async fn current_position(&self, accuracy: Accuracy) -> Result<PositionSample, TrackerError>;

    /// Start a watch. The stream ends when the receiver is dropped.
    async fn watch_position(
        &self,
        options: &WatchOptions,
    ) -> Result<mpsc::Receiver<PositionSample>, TrackerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_screen_text() {
        assert_eq!(
            TrackerError::ServicesDisabled.to_string(),
            "Location services are disabled. Please enable them in your device settings."
        );
        assert_eq!(
            TrackerError::PermissionDenied.to_string(),
            "Permission to access location was denied"
        );
        assert_eq!(
            TrackerError::Unavailable("Failed to get location".into()).to_string(),
            "Failed to get location"
        );
    }

    #[test]
    fn settings_action() {
        assert!(TrackerError::ServicesDisabled.needs_settings());
        assert!(TrackerError::PermissionDenied.needs_settings());
        assert!(!TrackerError::Unavailable("gps".into()).needs_settings());
    }

    #[test]
    fn default_watch_options() {
        let options = WatchOptions::default();
        assert_eq!(options.accuracy, Accuracy::High);
        assert_eq!(options.time_interval, Duration::from_secs(5));
        assert_eq!(options.distance_interval, 5.0);
    }
}
