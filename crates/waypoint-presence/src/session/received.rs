use waypoint_common::{Marker, PositionEvent};

/// Locations received from other participants, in arrival order.
///
/// Append-only for the lifetime of a session. No deduplication: two events
/// with the same timestamp are both kept.
#[derive(Debug, Clone, Default)]
pub struct ReceivedEventSet {
    events: Vec<PositionEvent>,
}

impl ReceivedEventSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: PositionEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&PositionEvent> {
        self.events.last()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Display key for each event: `(timestamp, index)`.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.events
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}-{i}", e.timestamp))
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.events.iter().map(Marker::remote).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_common::MarkerKind;

    fn event(lat: f64, ts: &str) -> PositionEvent {
        PositionEvent {
            latitude: lat,
            longitude: 0.0,
            timestamp: ts.into(),
        }
    }

    #[test]
    fn keeps_order_and_duplicates() {
        let mut set = ReceivedEventSet::new();
        assert!(set.is_empty());
        set.push(event(1.0, "2024-01-01T00:00:00.000Z"));
        set.push(event(2.0, "2024-01-01T00:00:00.000Z"));
        set.push(event(3.0, "2024-01-01T00:00:01.000Z"));

        assert_eq!(set.len(), 3);
        let lats: Vec<f64> = set.iter().map(|e| e.latitude).collect();
        assert_eq!(lats, vec![1.0, 2.0, 3.0]);
        assert_eq!(set.latest().map(|e| e.latitude), Some(3.0));
    }

    #[test]
    fn keys_are_unique_for_equal_timestamps() {
        let mut set = ReceivedEventSet::new();
        set.push(event(1.0, "t"));
        set.push(event(2.0, "t"));
        let keys: Vec<String> = set.keys().collect();
        assert_eq!(keys, vec!["t-0", "t-1"]);
    }

    #[test]
    fn markers_are_remote() {
        let mut set = ReceivedEventSet::new();
        set.push(event(1.0, "2024-01-01T00:00:00.000Z"));
        let markers = set.markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].kind, MarkerKind::Remote);

        set.clear();
        assert!(set.markers().is_empty());
    }
}
