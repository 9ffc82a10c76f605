pub mod channel;
pub mod errors;
pub mod id;
pub mod protocol;
pub mod types;

pub use channel::channel_name_problem;
pub use errors::{ConfigError, WaypointError};
pub use id::{new_id, ClientId};
pub use protocol::{BroadcastPayload, JoinConfig, PhoenixMessage, ReplyStatus};
pub use types::{ceil_millis, iso_timestamp, Marker, MarkerKind, PositionEvent, PositionSample};

pub type Result<T> = std::result::Result<T, WaypointError>;
