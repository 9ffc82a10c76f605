use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for haversine distances.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A raw (latitude, longitude) reading from the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both coordinates are finite and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance in metres.
    pub fn distance_to(&self, other: &PositionSample) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// Format a UTC instant the way JavaScript's `Date.toISOString` does
/// (`2024-05-01T12:00:00.123Z`).
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Round up to the next whole millisecond, so a stamp formatted with
/// [`iso_timestamp`] is never earlier than `at`.
pub fn ceil_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    let sub_ms = at.timestamp_subsec_nanos() % 1_000_000;
    if sub_ms == 0 {
        return at;
    }
    at + chrono::Duration::nanoseconds(i64::from(1_000_000 - sub_ms))
}

/// A timestamped position sample, as carried in a `location` broadcast.
///
/// The field set is the interoperability contract with other clients and
/// must stay exactly `{latitude, longitude, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEvent {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
}

impl PositionEvent {
    pub fn stamp(sample: PositionSample, at: DateTime<Utc>) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            timestamp: iso_timestamp(at),
        }
    }

    pub fn sample(&self) -> PositionSample {
        PositionSample::new(self.latitude, self.longitude)
    }

    /// Parsed timestamp, or `None` if the sender emitted something that is
    /// not RFC 3339.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}
