mod cli;
mod runner;

use tracing_subscriber::EnvFilter;
use waypoint_common::ConfigError;
use waypoint_config::WaypointConfig;

/// Load environment variables from a .env file (KEY=VALUE lines).
///
/// Existing variables win, so `WAYPOINT_API_KEY=... waypoint` still
/// overrides the file.
fn load_dotenv() {
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        // Workspace root, two levels up from crates/waypoint-app/
        manifest_dir.join("..").join("..").join(".env"),
        std::path::PathBuf::from(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for (key, value) in parse_dotenv(&contents) {
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
            return;
        }
    }
}

fn parse_dotenv(contents: &str) -> Vec<(&str, &str)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            (
                key.trim(),
                value.trim().trim_matches('"').trim_matches('\''),
            )
        })
        .collect()
}

fn load_config(args: &cli::Args) -> Result<WaypointConfig, ConfigError> {
    match &args.config {
        Some(path) => waypoint_config::load_config_from(path),
        None => waypoint_config::load_config(),
    }
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    load_dotenv();

    let args = cli::parse();

    // Config comes first so `logging.level` can seed the filter; a load
    // failure is reported once logging is up.
    let loaded = load_config(&args);
    let config_level = loaded
        .as_ref()
        .map(|c| c.logging.level.as_directive())
        .unwrap_or("info");

    let filter = match args.log_level.as_deref() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("waypoint={config_level}"))),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("waypoint v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        let mut defaults = WaypointConfig::default();
        waypoint_config::env::apply_env_overrides(&mut defaults);
        defaults
    });
    if let Some(channel) = &args.channel {
        config.channel.name = channel.clone();
    }
    if config.realtime.api_key.is_empty() {
        tracing::warn!(
            "No API key configured (set {} or realtime.api_key); running local-only",
            waypoint_config::env::API_KEY_VAR
        );
    }
    tracing::info!(
        channel = %config.channel.name,
        endpoint = %config.realtime.endpoint,
        "Config loaded"
    );

    if let Err(e) = runner::run(&args, &config).await {
        tracing::error!("waypoint failed: {e}");
        std::process::exit(1);
    }
    tracing::info!("Shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_lines() {
        let parsed = parse_dotenv(
            "# comment\n\nWAYPOINT_API_KEY=\"abc\"\n WAYPOINT_CHANNEL = ride_07 \nbroken\n",
        );
        assert_eq!(
            parsed,
            vec![("WAYPOINT_API_KEY", "abc"), ("WAYPOINT_CHANNEL", "ride_07")]
        );
    }
}
