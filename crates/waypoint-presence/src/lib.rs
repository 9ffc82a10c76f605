//! Real-time location presence: a Phoenix-channels client for one named
//! channel, device location tracking, and the map session that ties them
//! together.

pub mod channel;
pub mod error;
mod realtime;
pub mod session;
pub mod tracker;

pub use channel::{ConnectionState, PresenceChannel, PresenceConfig, ReconnectPolicy};
pub use error::{ConnectionConfigError, ConnectionFailedError, PublishError};
pub use session::{MapSession, ReceivedEventSet, ScreenState, SessionOptions};
pub use tracker::{
    Accuracy, LocationProvider, LocationTracker, PermissionStatus, ScriptedProvider, TrackerError,
    TrackerState, WatchOptions,
};
pub use waypoint_common::{Marker, MarkerKind, PositionEvent, PositionSample};
