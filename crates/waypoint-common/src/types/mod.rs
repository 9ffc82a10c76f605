mod marker;
mod position;

pub use marker::{Marker, MarkerKind};
pub use position::{ceil_millis, iso_timestamp, PositionEvent, PositionSample};
