use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use waypoint_common::PositionSample;

use super::filter::SampleFilter;
use super::provider::{Accuracy, LocationProvider, PermissionStatus, TrackerError, WatchOptions};

/// Samples buffered for the consumer before the tracker waits.
const SAMPLE_QUEUE: usize = 32;

/// What the tracker currently knows about the device position.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerState {
    Loading,
    Ready(PositionSample),
    Error(TrackerError),
    Stopped,
}

impl TrackerState {
    pub fn position(&self) -> Option<PositionSample> {
        match self {
            TrackerState::Ready(sample) => Some(*sample),
            _ => None,
        }
    }
}

/// Runs the acquisition flow against a [`LocationProvider`] and forwards
/// filtered samples.
pub struct LocationTracker {
    state_tx: Arc<watch::Sender<TrackerState>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl LocationTracker {
    /// Start tracking. The receiver yields the initial fix followed by every
    /// watched sample that passes the `options` filter.
    pub fn start(
        provider: Arc<dyn LocationProvider>,
        options: WatchOptions,
    ) -> (Self, mpsc::Receiver<PositionSample>) {
        let (state_tx, _) = watch::channel(TrackerState::Loading);
        let state_tx = Arc::new(state_tx);
        let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_QUEUE);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_tracker(
            provider,
            options,
            Arc::clone(&state_tx),
            sample_tx,
            cancel.clone(),
        ));

        let tracker = Self {
            state_tx,
            cancel,
            task: Some(task),
        };
        (tracker, sample_rx)
    }

    pub fn state(&self) -> TrackerState {
        self.state_tx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<TrackerState> {
        self.state_tx.subscribe()
    }

    /// End the watch and wait for the tracker task.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.state_tx.send_replace(TrackerState::Stopped);
        debug!("Location tracker stopped");
    }
}

impl Drop for LocationTracker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_tracker(
    provider: Arc<dyn LocationProvider>,
    options: WatchOptions,
    state: Arc<watch::Sender<TrackerState>>,
    samples: mpsc::Sender<PositionSample>,
    cancel: CancellationToken,
) {
    let acquired = tokio::select! {
        _ = cancel.cancelled() => return,
        result = acquire(provider.as_ref(), &options) => result,
    };

    let (initial, mut watched) = match acquired {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Location unavailable");
            state.send_replace(TrackerState::Error(e));
            return;
        }
    };

    info!(
        latitude = initial.latitude,
        longitude = initial.longitude,
        "Initial position acquired"
    );
    state.send_replace(TrackerState::Ready(initial));
    if samples.send(initial).await.is_err() {
        debug!("Sample consumer gone before initial fix");
    }

    let mut filter = SampleFilter::new(options);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = watched.recv() => match next {
                Some(sample) => {
                    if !filter.accept(sample, tokio::time::Instant::now()) {
                        continue;
                    }
                    state.send_replace(TrackerState::Ready(sample));
                    if samples.send(sample).await.is_err() {
                        debug!("Sample consumer gone");
                    }
                }
                None => {
                    debug!("Position watch ended");
                    break;
                }
            },
        }
    }
}

/// Services check, permission request, initial fix, then start the watch.
async fn acquire(
    provider: &dyn LocationProvider,
    options: &WatchOptions,
) -> Result<(PositionSample, mpsc::Receiver<PositionSample>), TrackerError> {
    if !provider.services_enabled().await {
        return Err(TrackerError::ServicesDisabled);
    }
    if provider.request_permission().await != PermissionStatus::Granted {
        return Err(TrackerError::PermissionDenied);
    }
    let initial = provider.current_position(Accuracy::Balanced).await?;
    let watched = provider.watch_position(options).await?;
    Ok((initial, watched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::ScriptedProvider;
    use std::time::Duration;

    fn route() -> Vec<PositionSample> {
        // Roughly 111 m apart.
        vec![
            PositionSample::new(37.000, -122.0),
            PositionSample::new(37.001, -122.0),
            PositionSample::new(37.002, -122.0),
        ]
    }

    async fn settled(tracker: &LocationTracker) -> TrackerState {
        let mut rx = tracker.watch_state();
        let state = rx
            .wait_for(|s| !matches!(s, TrackerState::Loading))
            .await
            .unwrap()
            .clone();
        state
    }

    #[tokio::test]
    async fn services_disabled_is_reported() {
        let provider = Arc::new(ScriptedProvider::new(route(), Duration::from_secs(5)).services_disabled());
        let (tracker, _rx) = LocationTracker::start(provider, WatchOptions::default());
        assert_eq!(
            settled(&tracker).await,
            TrackerState::Error(TrackerError::ServicesDisabled)
        );
    }

    #[tokio::test]
    async fn permission_denied_is_reported() {
        let provider = Arc::new(ScriptedProvider::new(route(), Duration::from_secs(5)).permission_denied());
        let (tracker, mut rx) = LocationTracker::start(provider, WatchOptions::default());
        assert_eq!(
            settled(&tracker).await,
            TrackerState::Error(TrackerError::PermissionDenied)
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_fix_then_filtered_watch() {
        let provider = Arc::new(ScriptedProvider::new(route(), Duration::from_secs(5)));
        let (mut tracker, mut rx) = LocationTracker::start(provider, WatchOptions::default());

        // Initial fix.
        assert_eq!(rx.recv().await, Some(route()[0]));
        // The watch replays the first point too; it is forwarded as the
        // filter's anchor.
        assert_eq!(rx.recv().await, Some(route()[0]));
        assert_eq!(rx.recv().await, Some(route()[1]));
        assert_eq!(rx.recv().await, Some(route()[2]));
        assert_eq!(tracker.state(), TrackerState::Ready(route()[2]));

        tracker.stop().await;
        assert_eq!(tracker.state(), TrackerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn samples_closer_than_distance_interval_are_dropped() {
        let route = vec![
            PositionSample::new(37.0, -122.0),
            PositionSample::new(37.00001, -122.0),
            PositionSample::new(37.001, -122.0),
        ];
        let provider = Arc::new(ScriptedProvider::new(route.clone(), Duration::from_secs(6)));
        let (_tracker, mut rx) = LocationTracker::start(provider, WatchOptions::default());

        assert_eq!(rx.recv().await, Some(route[0]));
        assert_eq!(rx.recv().await, Some(route[0]));
        assert_eq!(rx.recv().await, Some(route[2]));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_consumer_does_not_stall_tracker() {
        let provider = Arc::new(ScriptedProvider::new(route(), Duration::from_secs(5)));
        let (mut tracker, rx) = LocationTracker::start(provider, WatchOptions::default());
        drop(rx);

        assert_eq!(settled(&tracker).await, TrackerState::Ready(route()[0]));
        tracker.stop().await;
        assert_eq!(tracker.state(), TrackerState::Stopped);
    }
}
