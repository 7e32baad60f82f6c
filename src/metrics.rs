//! Running distance, duration and speed for a session in progress.
//!
//! Two independent triggers feed the accumulator:
//! - [`MetricsAccumulator::observe`] on every new fix updates distance and
//!   instantaneous speed
//! - [`MetricsAccumulator::tick`] on a fixed cadence updates duration and
//!   average speed, so they keep advancing between fixes

use crate::geo_utils::distance_km;
use crate::{Metrics, Position, Timestamp};

/// Incremental metrics state for one session.
#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    total_distance_km: f64,
    last_position: Option<Position>,
    session_started_at: Timestamp,
    metrics: Metrics,
}

impl MetricsAccumulator {
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            session_started_at: started_at,
            ..Self::default()
        }
    }

    /// Clear accumulated distance and the last fix, and set the start time.
    pub fn reset(&mut self, started_at: Timestamp) {
        self.total_distance_km = 0.0;
        self.last_position = None;
        self.session_started_at = started_at;
        self.metrics = Metrics::default();
    }

    /// Fold a new fix into the running totals.
    ///
    /// Instantaneous speed is 0 when the fix is not strictly newer than the
    /// previous one. Duration and average speed are left as the last tick set them.
    pub fn observe(&mut self, position: Position) -> Metrics {
        if let Some(last) = self.last_position {
            let increment_km = distance_km(&last, &position);
            let elapsed_sec = (position.captured_at - last.captured_at) as f64 / 1000.0;

            self.total_distance_km += increment_km;
            self.metrics.distance_km = self.total_distance_km;
            self.metrics.current_speed_kmh = if elapsed_sec > 0.0 {
                (increment_km / elapsed_sec) * 3600.0
            } else {
                0.0
            };
        }

        self.last_position = Some(position);
        self.metrics
    }

    /// Advance duration and average speed to `now`.
    pub fn tick(&mut self, now: Timestamp) -> Metrics {
        let duration_sec = ((now - self.session_started_at) as f64 / 1000.0).max(0.0);

        self.metrics.duration_sec = duration_sec;
        self.metrics.avg_speed_kmh = if self.total_distance_km > 0.0 && duration_sec > 0.0 {
            (self.total_distance_km / duration_sec) * 3600.0
        } else {
            0.0
        };
        self.metrics
    }

    /// Move the effective start time forward, excluding `by_ms` from duration.
    pub fn shift_start(&mut self, by_ms: i64) {
        self.session_started_at += by_ms.max(0);
    }

    /// Forget the last fix so the next one starts a new segment.
    ///
    /// Used on resume: ground covered while paused is not counted.
    pub fn break_segment(&mut self) {
        self.last_position = None;
        self.metrics.current_speed_kmh = 0.0;
    }

    /// Latest metrics snapshot.
    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn total_distance_km(&self) -> f64 {
        self.total_distance_km
    }

    pub fn last_position(&self) -> Option<Position> {
        self.last_position
    }

    pub fn session_started_at(&self) -> Timestamp {
        self.session_started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fix_has_no_distance() {
        let mut acc = MetricsAccumulator::new(0);
        let m = acc.observe(Position::new(40.0, -75.0, 0));
        assert_eq!(m.distance_km, 0.0);
        assert_eq!(m.current_speed_kmh, 0.0);
        assert_eq!(acc.last_position(), Some(Position::new(40.0, -75.0, 0)));
    }

    #[test]
    fn test_observe_and_tick_scenario() {
        let mut acc = MetricsAccumulator::new(0);
        acc.observe(Position::new(40.0, -75.0, 0));
        let m = acc.observe(Position::new(40.001, -75.0, 10_000));

        assert!((m.distance_km - 0.111).abs() < 0.001, "distance {}", m.distance_km);
        assert!((m.current_speed_kmh - 40.0).abs() < 0.1, "speed {}", m.current_speed_kmh);
        // Not touched by observe
        assert_eq!(m.duration_sec, 0.0);
        assert_eq!(m.avg_speed_kmh, 0.0);

        let m = acc.tick(10_000);
        assert_eq!(m.duration_sec, 10.0);
        assert!((m.avg_speed_kmh - 40.0).abs() < 0.1);
        // Tick keeps the instantaneous speed from the last fix
        assert!((m.current_speed_kmh - 40.0).abs() < 0.1);
    }

    #[test]
    fn test_identical_timestamps_never_divide_by_zero() {
        let mut acc = MetricsAccumulator::new(0);
        acc.observe(Position::new(40.0, -75.0, 5_000));
        let m = acc.observe(Position::new(40.01, -75.0, 5_000));
        assert_eq!(m.current_speed_kmh, 0.0);
        assert!(m.distance_km > 1.0);
    }

    #[test]
    fn test_backwards_timestamp_yields_zero_speed() {
        let mut acc = MetricsAccumulator::new(0);
        acc.observe(Position::new(40.0, -75.0, 9_000));
        let m = acc.observe(Position::new(40.001, -75.0, 1_000));
        assert_eq!(m.current_speed_kmh, 0.0);
        assert!(m.current_speed_kmh.is_finite());
    }

    #[test]
    fn test_tick_without_distance() {
        let mut acc = MetricsAccumulator::new(1_000);
        let m = acc.tick(4_000);
        assert_eq!(m.duration_sec, 3.0);
        assert_eq!(m.avg_speed_kmh, 0.0);

        // Clock before start clamps to zero
        let m = acc.tick(0);
        assert_eq!(m.duration_sec, 0.0);
        assert_eq!(m.avg_speed_kmh, 0.0);
    }

    #[test]
    fn test_duration_advances_between_fixes() {
        let mut acc = MetricsAccumulator::new(0);
        acc.observe(Position::new(40.0, -75.0, 0));
        acc.observe(Position::new(40.001, -75.0, 10_000));
        let first = acc.tick(10_000);
        let later = acc.tick(20_000);
        assert_eq!(later.distance_km, first.distance_km);
        assert_eq!(later.duration_sec, 20.0);
        assert!(later.avg_speed_kmh < first.avg_speed_kmh);
    }

    #[test]
    fn test_reset() {
        let mut acc = MetricsAccumulator::new(0);
        acc.observe(Position::new(40.0, -75.0, 0));
        acc.observe(Position::new(40.001, -75.0, 10_000));
        acc.tick(10_000);

        acc.reset(50_000);
        assert_eq!(acc.metrics(), Metrics::default());
        assert_eq!(acc.total_distance_km(), 0.0);
        assert!(acc.last_position().is_none());
        assert_eq!(acc.session_started_at(), 50_000);
    }

    #[test]
    fn test_shift_start_and_break_segment() {
        let mut acc = MetricsAccumulator::new(0);
        acc.observe(Position::new(40.0, -75.0, 0));
        acc.observe(Position::new(40.001, -75.0, 10_000));
        let before = acc.total_distance_km();

        // Paused for 30 s, moved 1 km meanwhile
        acc.shift_start(30_000);
        acc.break_segment();
        let m = acc.observe(Position::new(40.01, -75.0, 40_000));
        assert_eq!(m.distance_km, before);
        assert_eq!(m.current_speed_kmh, 0.0);

        let m = acc.tick(40_000);
        assert_eq!(m.duration_sec, 10.0);
    }
}
