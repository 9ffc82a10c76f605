use serde::{Deserialize, Serialize};

use super::position::{PositionEvent, PositionSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// The device's own tracked position.
    Own,
    /// The pin the user dropped.
    Selected,
    /// A location received from another participant.
    Remote,
}

/// A renderable map marker, the only thing handed to the map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
    pub description: Option<String>,
    pub kind: MarkerKind,
}

impl Marker {
    pub fn own(sample: PositionSample) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            label: "Current Location".into(),
            description: None,
            kind: MarkerKind::Own,
        }
    }

    pub fn selected(sample: PositionSample) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
            label: "Selected Location".into(),
            description: None,
            kind: MarkerKind::Selected,
        }
    }

    pub fn remote(event: &PositionEvent) -> Self {
        let updated = event
            .timestamp_utc()
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| event.timestamp.clone());
        Self {
            latitude: event.latitude,
            longitude: event.longitude,
            label: "Other User's Location".into(),
            description: Some(format!("Updated: {updated}")),
            kind: MarkerKind::Remote,
        }
    }
}
