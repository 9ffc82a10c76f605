//! A provider that replays a fixed route.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;
use waypoint_common::PositionSample;

use super::provider::{Accuracy, LocationProvider, PermissionStatus, TrackerError, WatchOptions};

/// Replays `route` one point per `step`. The first point is the initial fix.
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    route: Vec<PositionSample>,
    step: Duration,
    services_enabled: bool,
    permission: PermissionStatus,
    looping: bool,
}

impl ScriptedProvider {
    pub fn new(route: Vec<PositionSample>, step: Duration) -> Self {
        Self {
            route,
            step,
            services_enabled: true,
            permission: PermissionStatus::Undetermined,
            looping: false,
        }
    }

    /// A provider that never moves.
    pub fn fixed(sample: PositionSample) -> Self {
        Self::new(vec![sample], Duration::from_secs(1))
    }

    pub fn services_disabled(mut self) -> Self {
        self.services_enabled = false;
        self
    }

    pub fn permission_denied(mut self) -> Self {
        self.permission = PermissionStatus::Denied;
        self
    }

    /// Start the route over after the last point instead of ending the watch.
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    pub fn route(&self) -> &[PositionSample] {
        &self.route
    }
}

#[async_trait]
impl LocationProvider for ScriptedProvider {
    async fn services_enabled(&self) -> bool {
        self.services_enabled
    }

    async fn permission_status(&self) -> PermissionStatus {
        self.permission
    }

    async fn request_permission(&self) -> PermissionStatus {
        match self.permission {
            PermissionStatus::Undetermined => PermissionStatus::Granted,
            other => other,
        }
    }

    async fn current_position(&self, _accuracy: Accuracy) -> Result<PositionSample, TrackerError> {
        self.route
            .first()
            .copied()
            .ok_or_else(|| TrackerError::Unavailable("Failed to get location".into()))
    }

    async fn watch_position(
        &self,
        _options: &WatchOptions,
    ) -> Result<mpsc::Receiver<PositionSample>, TrackerError> {
        if self.route.is_empty() {
            return Err(TrackerError::Unavailable("Failed to get location".into()));
        }

        let (tx, rx) = mpsc::channel(16);
        let route = self.route.clone();
        let step = self.step;
        let looping = self.looping;

        tokio::spawn(async move {
            loop {
                for sample in &route {
                    if tx.send(*sample).await.is_err() {
                        return;
                    }
                    tokio::time::sleep(step).await;
                }
                if !looping {
                    debug!("Scripted route finished");
                    return;
                }
            }
        });

        Ok(rx)
    }
}
