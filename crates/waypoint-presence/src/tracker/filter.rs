use tokio::time::Instant;
use waypoint_common::PositionSample;

use super::provider::WatchOptions;

/// Drops watched samples that arrive too soon or moved too little since
/// the last forwarded one.
#[derive(Debug, Clone)]
pub struct SampleFilter {
    options: WatchOptions,
    last: Option<(PositionSample, Instant)>,
}

impl SampleFilter {
    pub fn new(options: WatchOptions) -> Self {
        Self {
            options,
            last: None,
        }
    }

    /// Returns true (and remembers the sample) when it should be forwarded.
    pub fn accept(&mut self, sample: PositionSample, at: Instant) -> bool {
        if !sample.is_valid() {
            return false;
        }
        if let Some((prev, prev_at)) = &self.last {
            let elapsed = at.saturating_duration_since(*prev_at);
            if elapsed < self.options.time_interval {
                return false;
            }
            if prev.distance_to(&sample) < self.options.distance_interval {
                return false;
            }
        }
        self.last = Some((sample, at));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn filter() -> SampleFilter {
        SampleFilter::new(WatchOptions::default())
    }

    #[test]
    fn first_sample_passes() {
        assert!(filter().accept(PositionSample::new(37.0, -122.0), Instant::now()));
    }

    #[test]
    fn too_soon_is_dropped() {
        let mut f = filter();
        let t0 = Instant::now();
        assert!(f.accept(PositionSample::new(37.0, -122.0), t0));
        // ~111 m north, but only 1 s later.
        assert!(!f.accept(
            PositionSample::new(37.001, -122.0),
            t0 + Duration::from_secs(1)
        ));
        assert!(f.accept(
            PositionSample::new(37.001, -122.0),
            t0 + Duration::from_secs(5)
        ));
    }

    #[test]
    fn too_close_is_dropped() {
        let mut f = filter();
        let t0 = Instant::now();
        assert!(f.accept(PositionSample::new(37.0, -122.0), t0));
        // ~1 m.
        assert!(!f.accept(
            PositionSample::new(37.00001, -122.0),
            t0 + Duration::from_secs(10)
        ));
    }

    #[test]
    fn rejected_samples_do_not_move_the_anchor() {
        let mut f = filter();
        let t0 = Instant::now();
        assert!(f.accept(PositionSample::new(37.0, -122.0), t0));
        assert!(!f.accept(
            PositionSample::new(37.00003, -122.0),
            t0 + Duration::from_secs(6)
        ));
        // ~6.7 m from the anchor, even though only ~3.3 m from the last sample.
        assert!(f.accept(
            PositionSample::new(37.00006, -122.0),
            t0 + Duration::from_secs(7)
        ));
    }

    #[test]
    fn invalid_samples_are_dropped() {
        assert!(!filter().accept(PositionSample::new(f64::NAN, 0.0), Instant::now()));
    }
}
