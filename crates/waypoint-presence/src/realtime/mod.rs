//! Phoenix Channels v1 transport for a single presence channel.
//!
//! Owns the WebSocket: heartbeats, channel join/leave, location broadcasts
//! with acknowledgements, and optional reconnect with backoff.

mod connection;
mod handler;

pub(crate) use connection::{connection_loop, Command, ConnectionParams};
