use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use waypoint_common::{Marker, PositionEvent, PositionSample};

use super::received::ReceivedEventSet;
use crate::channel::{ConnectionState, PresenceChannel, PresenceConfig};
use crate::tracker::TrackerState;

/// Inbound events queued between the channel handler and the session.
const INBOUND_QUEUE: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Publish every own position update, not only dropped pins.
    pub broadcast_own_position: bool,
}

/// What the screen should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenState {
    /// Waiting for the first position fix.
    Loading,
    /// Location is unavailable. `open_settings` offers the settings action.
    Error { message: String, open_settings: bool },
    Ready,
}

/// The map screen without the map: owns the presence channel and the
/// Received Event Set.
///
/// Inbound events reach the session through a queue, so the set has a
/// single writer: whoever owns the session and calls `next_inbound` or
/// `drain_inbound`.
pub struct MapSession {
    channel: Option<PresenceChannel>,
    inbound_rx: mpsc::Receiver<PositionEvent>,
    received: ReceivedEventSet,
    own: Option<PositionSample>,
    selected: Option<PositionSample>,
    tracker_state: TrackerState,
    options: SessionOptions,
}

impl MapSession {
    /// Start a session on `channel`. `None` runs it local-only.
    pub fn new(channel: Option<PresenceChannel>, options: SessionOptions) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
        match &channel {
            Some(channel) => channel.subscribe(move |event| {
                if let Err(e) = inbound_tx.try_send(event) {
                    warn!(error = %e, "Map session inbound queue rejected location");
                }
            }),
            None => info!("Map session running without a presence channel"),
        }

        Self {
            channel,
            inbound_rx,
            received: ReceivedEventSet::new(),
            own: None,
            selected: None,
            tracker_state: TrackerState::Loading,
            options,
        }
    }

    /// Connect with `config`; a configuration error degrades the session
    /// to local-only instead of failing.
    pub fn connect(config: PresenceConfig, options: SessionOptions) -> Self {
        let channel = match PresenceChannel::connect(config) {
            Ok(channel) => Some(channel),
            Err(e) => {
                warn!(error = %e, "Presence channel unavailable, continuing without it");
                None
            }
        };
        Self::new(channel, options)
    }

    pub fn channel(&self) -> Option<&PresenceChannel> {
        self.channel.as_ref()
    }

    /// `None` when the session is local-only.
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.channel.as_ref().map(PresenceChannel::state)
    }

    pub fn on_tracker_state(&mut self, state: TrackerState) {
        if let TrackerState::Ready(sample) = &state {
            self.own = Some(*sample);
        }
        self.tracker_state = state;
    }

    /// Record a new own position, broadcasting it if enabled.
    pub fn on_position(&mut self, sample: PositionSample) -> Option<PositionEvent> {
        self.own = Some(sample);
        if !matches!(self.tracker_state, TrackerState::Error(_)) {
            self.tracker_state = TrackerState::Ready(sample);
        }
        if !self.options.broadcast_own_position {
            return None;
        }
        let channel = self.channel.as_ref()?;
        match channel.publish(sample) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(error = %e, "Own position not broadcast");
                None
            }
        }
    }

    /// Select `sample` and publish it. The pin stays selected locally even
    /// when the publish fails.
    pub fn drop_pin(&mut self, sample: PositionSample) -> Option<PositionEvent> {
        self.selected = Some(sample);
        let channel = self.channel.as_ref()?;
        match channel.publish(sample) {
            Ok(event) => {
                info!(
                    latitude = event.latitude,
                    longitude = event.longitude,
                    "Pin published"
                );
                Some(event)
            }
            Err(e) => {
                warn!(error = %e, "Pin kept local, publish failed");
                None
            }
        }
    }

    /// Move every queued inbound event into the Received Event Set.
    pub fn drain_inbound(&mut self) -> usize {
        let mut moved = 0;
        while let Ok(event) = self.inbound_rx.try_recv() {
            self.received.push(event);
            moved += 1;
        }
        moved
    }

    /// Wait for the next inbound event and append it. `None` once the
    /// channel is gone.
    pub async fn next_inbound(&mut self) -> Option<&PositionEvent> {
        let event = self.inbound_rx.recv().await?;
        self.received.push(event);
        self.received.latest()
    }

    pub fn received(&self) -> &ReceivedEventSet {
        &self.received
    }

    pub fn own_position(&self) -> Option<PositionSample> {
        self.own
    }

    pub fn selected(&self) -> Option<PositionSample> {
        self.selected
    }

    pub fn screen_state(&self) -> ScreenState {
        match &self.tracker_state {
            TrackerState::Error(e) => ScreenState::Error {
                message: e.to_string(),
                open_settings: e.needs_settings(),
            },
            _ if self.own.is_none() => ScreenState::Loading,
            _ => ScreenState::Ready,
        }
    }

    /// Everything the map should draw: own position, the dropped pin, then
    /// received locations in arrival order.
    pub fn markers(&self) -> Vec<Marker> {
        let mut markers = Vec::with_capacity(self.received.len() + 2);
        if let Some(own) = self.own {
            markers.push(Marker::own(own));
        }
        if let Some(selected) = self.selected {
            markers.push(Marker::selected(selected));
        }
        markers.extend(self.received.markers());
        markers
    }

    /// Dispose the channel. The Received Event Set is dropped with the session.
    pub async fn close(self) {
        if let Some(channel) = &self.channel {
            channel.dispose().await;
        }
        debug!(received = self.received.len(), "Map session closed");
    }
}
