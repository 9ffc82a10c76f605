//! Device location acquisition: permission flow, initial fix and a
//! filtered stream of watched samples.

mod core;
mod filter;
mod provider;
mod scripted;

pub use self::core::{LocationTracker, TrackerState};
pub use filter::SampleFilter;
pub use provider::{Accuracy, LocationProvider, PermissionStatus, TrackerError, WatchOptions};
pub use scripted::ScriptedProvider;
