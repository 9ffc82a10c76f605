//! Headless map session: tracker feed in, markers and remote locations out.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use waypoint_common::{PositionSample, WaypointError};
use waypoint_config::schema::{Accuracy as ConfigAccuracy, TrackerConfig};
use waypoint_config::WaypointConfig;
use waypoint_presence::{
    Accuracy, ConnectionState, LocationTracker, MapSession, PresenceConfig, ReconnectPolicy,
    ScreenState, ScriptedProvider, SessionOptions, WatchOptions,
};

use crate::cli::Args;

/// How often inbound locations are moved into the session.
const DRAIN_INTERVAL: Duration = Duration::from_millis(250);

/// Channel client settings from the loaded config.
pub fn presence_config(config: &WaypointConfig) -> PresenceConfig {
    let rt = &config.realtime;
    PresenceConfig {
        endpoint: rt.endpoint.clone(),
        api_key: rt.api_key.clone(),
        channel: config.channel.name.clone(),
        echo_self: config.channel.echo_self,
        heartbeat_interval: Duration::from_secs(rt.heartbeat_interval.into()),
        connect_timeout: Duration::from_secs(rt.connect_timeout.into()),
        ack_timeout: Duration::from_secs(rt.ack_timeout.into()),
        max_payload_bytes: rt.max_payload_bytes as usize,
        reconnect: rt.reconnect.enabled.then(|| ReconnectPolicy {
            base_delay: Duration::from_secs(rt.reconnect.base_delay.into()),
            max_delay: Duration::from_secs(rt.reconnect.max_delay.into()),
        }),
    }
}

pub fn watch_options(tracker: &TrackerConfig) -> WatchOptions {
    WatchOptions {
        accuracy: match tracker.accuracy {
            ConfigAccuracy::Low => Accuracy::Low,
            ConfigAccuracy::Balanced => Accuracy::Balanced,
            ConfigAccuracy::High => Accuracy::High,
        },
        time_interval: Duration::from_millis(tracker.time_interval_ms.into()),
        distance_interval: tracker.distance_interval,
    }
}

/// Read a route file: a JSON array of `{latitude, longitude}`.
pub fn load_route(path: &Path) -> Result<Vec<PositionSample>, WaypointError> {
    let contents = std::fs::read_to_string(path)?;
    let route: Vec<PositionSample> = serde_json::from_str(&contents)
        .map_err(|e| WaypointError::Location(format!("{}: {e}", path.display())))?;
    if let Some(bad) = route.iter().find(|s| !s.is_valid()) {
        return Err(WaypointError::Location(format!(
            "{}: invalid point ({}, {})",
            path.display(),
            bad.latitude,
            bad.longitude
        )));
    }
    Ok(route)
}

/// Run the session until Ctrl-C or `--duration` elapses.
pub async fn run(args: &Args, config: &WaypointConfig) -> Result<(), WaypointError> {
    let step = Duration::from_secs(args.step.max(1));
    let provider = match &args.route {
        Some(path) => ScriptedProvider::new(load_route(path)?, step),
        None => ScriptedProvider::fixed(args.start),
    };
    tracing::info!(points = provider.route().len(), "Simulated location feed ready");

    let (mut tracker, mut samples) =
        LocationTracker::start(Arc::new(provider), watch_options(&config.tracker));
    let mut tracker_state = tracker.watch_state();

    let mut session = MapSession::connect(
        presence_config(config),
        SessionOptions {
            broadcast_own_position: config.tracker.broadcast_own_position,
        },
    );
    let mut connection = session.channel().map(|c| c.watch_state());
    let mut pending_pin = args.pin;

    let deadline = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut drain = tokio::time::interval(DRAIN_INTERVAL);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
            _ = &mut deadline => {
                tracing::info!("Duration elapsed");
                break;
            }
            Some(sample) = samples.recv() => {
                if let Some(event) = session.on_position(sample) {
                    tracing::debug!(timestamp = %event.timestamp, "Own position broadcast");
                }
                tracing::info!(
                    latitude = sample.latitude,
                    longitude = sample.longitude,
                    "Own position"
                );
            }
            Ok(()) = tracker_state.changed() => {
                let state = tracker_state.borrow_and_update().clone();
                session.on_tracker_state(state);
                match session.screen_state() {
                    ScreenState::Error { message, open_settings } => {
                        tracing::error!(open_settings, "{message}");
                    }
                    other => tracing::debug!(screen = ?other, "Screen state"),
                }
            }
            Some(state) = next_state(&mut connection) => {
                tracing::info!(state = %state, "Connection state");
                if state == ConnectionState::Connected {
                    if let Some(pin) = pending_pin.take() {
                        session.drop_pin(pin);
                    }
                }
            }
            _ = drain.tick() => {
                let before = session.received().len();
                if session.drain_inbound() > 0 {
                    for event in session.received().iter().skip(before) {
                        tracing::info!(
                            latitude = event.latitude,
                            longitude = event.longitude,
                            timestamp = %event.timestamp,
                            "Location received"
                        );
                    }
                }
            }
        }
    }

    tracker.stop().await;
    session.drain_inbound();
    let markers = session.markers();
    session.close().await;

    match serde_json::to_string_pretty(&markers) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize markers"),
    }
    Ok(())
}

/// Next connection state change, or never for a local-only session.
async fn next_state(rx: &mut Option<watch::Receiver<ConnectionState>>) -> Option<ConnectionState> {
    match rx {
        Some(rx) => {
            rx.changed().await.ok()?;
            let state = rx.borrow_and_update().clone();
            Some(state)
        }
        None => std::future::pending().await,
    }
}
