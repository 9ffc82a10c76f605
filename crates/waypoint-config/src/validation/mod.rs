//! Full configuration validation.
//!
//! Each section has its own validator; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod sections;

#[cfg(test)]
mod tests;

use crate::schema::WaypointConfig;
use waypoint_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &WaypointConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sections::validate_channel(&mut errors, config);
    sections::validate_realtime(&mut errors, config);
    sections::validate_tracker(&mut errors, config);
    sections::validate_relay(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
