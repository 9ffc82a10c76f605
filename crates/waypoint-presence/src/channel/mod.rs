//! Presence channel client: connect, publish, subscribe, dispose.

mod client;
mod config;
mod state;

pub use client::PresenceChannel;
pub use config::{PresenceConfig, ReconnectPolicy};
pub use state::ConnectionState;
