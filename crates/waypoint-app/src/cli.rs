use std::path::PathBuf;

use clap::Parser;
use waypoint_common::PositionSample;

/// Waypoint: share your location on a real-time channel.
#[derive(Parser, Debug)]
#[command(name = "waypoint", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Channel to join (overrides `channel.name`).
    #[arg(long)]
    pub channel: Option<String>,

    /// Drop a pin at `lat,lon` once connected.
    #[arg(long, value_parser = parse_point)]
    pub pin: Option<PositionSample>,

    /// Simulated device position as `lat,lon` when no route is given.
    #[arg(long, value_parser = parse_point, default_value = "37.7749,-122.4194")]
    pub start: PositionSample,

    /// JSON file with `[{"latitude": .., "longitude": ..}, ..]` to replay as
    /// the device location feed.
    #[arg(long)]
    pub route: Option<PathBuf>,

    /// Seconds between route points.
    #[arg(long, default_value_t = 5)]
    pub step: u64,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    pub duration: Option<u64>,
}

pub fn parse() -> Args {
    Args::parse()
}

/// Parse `lat,lon` into a valid sample.
pub fn parse_point(s: &str) -> Result<PositionSample, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lon, got {s:?}"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("bad latitude {lat:?}: {e}"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("bad longitude {lon:?}: {e}"))?;
    let sample = PositionSample::new(lat, lon);
    if !sample.is_valid() {
        return Err(format!("{lat},{lon} is outside valid coordinates"));
    }
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_points() {
        assert_eq!(
            parse_point("37.7749, -122.4194"),
            Ok(PositionSample::new(37.7749, -122.4194))
        );
        assert!(parse_point("37.7749").is_err());
        assert!(parse_point("abc,1").is_err());
        assert!(parse_point("95,1").is_err());
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from([
            "waypoint",
            "--channel",
            "ride_42",
            "--pin",
            "1.5,2.5",
            "--duration",
            "10",
        ])
        .unwrap();
        assert_eq!(args.channel.as_deref(), Some("ride_42"));
        assert_eq!(args.pin, Some(PositionSample::new(1.5, 2.5)));
        assert_eq!(args.duration, Some(10));
        assert_eq!(args.start, PositionSample::new(37.7749, -122.4194));
    }
}
