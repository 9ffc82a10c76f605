//! Headless map screen controller: own position, dropped pin and the
//! locations received from other participants.

mod map;
mod received;

pub use map::{MapSession, ScreenState, SessionOptions};
pub use received::ReceivedEventSet;
