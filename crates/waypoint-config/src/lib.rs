//! Waypoint configuration system.
//!
//! Provides TOML-based configuration with environment overrides and full
//! validation. All config sections use sensible defaults so partial configs
//! work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use waypoint_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod env;
pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{WaypointConfig, CONFIG_SCHEMA_VERSION};

use std::path::Path;
use waypoint_common::ConfigError;

/// Load config from the platform default path.
///
/// Loads `config.toml` from the OS config directory, creates a default
/// if none exists, applies `WAYPOINT_*` environment overrides, and
/// validates the result.
pub fn load_config() -> Result<WaypointConfig, ConfigError> {
    let mut config = toml_loader::load_default()?;
    env::apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Same as [`load_config`] but for an explicit file.
pub fn load_config_from(path: &Path) -> Result<WaypointConfig, ConfigError> {
    let mut config = toml_loader::load_from_path(path)?;
    env::apply_env_overrides(&mut config);
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string with secrets removed.
pub fn config_to_json(config: &WaypointConfig) -> String {
    let mut redacted = config.clone();
    if !redacted.realtime.api_key.is_empty() {
        redacted.realtime.api_key = "[REDACTED]".into();
    }
    for key in &mut redacted.relay.api_keys {
        *key = "[REDACTED]".into();
    }
    serde_json::to_string_pretty(&redacted)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let json = config_to_json(&WaypointConfig::default());
        assert!(json.contains("\"channel\""));
        assert!(json.contains("\"realtime\""));
        assert!(json.contains("\"tracker\""));
        assert!(json.contains("\"relay\""));
        assert!(json.contains("\"logging\""));
        assert!(json.contains("\"ride_01\""));
    }

    #[test]
    fn config_to_json_hides_keys() {
        let mut config = WaypointConfig::default();
        config.realtime.api_key = "abc.def:ghi".into();
        config.relay.api_keys = vec!["abc.def:ghi".into()];
        let json = config_to_json(&config);
        assert!(!json.contains("abc.def:ghi"));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn load_config_from_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[realtime]\nheartbeat_interval = 1\n").unwrap();
        let result = load_config_from(&path);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
