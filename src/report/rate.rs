//! Frame counting and frame-rate bookkeeping for report sinks

use std::time::{Duration, Instant};

/// Counters owned by one sink. Callers provide the exclusion.
#[derive(Debug, Clone)]
pub struct RateCounters {
    total: u64,
    interval: u64,
    start: Instant,
    last: Option<Instant>,
}

/// What a single report observed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// 1-based sequence number of the report
    pub sequence: u64,
    pub elapsed: Duration,
    pub instant_fps: f64,
}

/// Per-interval summary returned by [`RateCounters::tick`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalSummary {
    pub total: u64,
    pub interval_frames: u64,
    pub elapsed: Duration,
    pub average_fps: f64,
}

impl RateCounters {
    pub fn new(start: Instant) -> Self {
        Self {
            total: 0,
            interval: 0,
            start,
            last: None,
        }
    }

    pub fn observe(&mut self, now: Instant) -> Observation {
        self.total += 1;
        self.interval += 1;

        // Zero on the first report and when the clock did not move forward
        let instant_fps = self
            .last
            .and_then(|prev| now.checked_duration_since(prev))
            .map(|gap| gap.as_secs_f64())
            .filter(|gap| *gap > 0.0)
            .map_or(0.0, |gap| 1.0 / gap);
        self.last = Some(now);

        Observation {
            sequence: self.total,
            elapsed: now.saturating_duration_since(self.start),
            instant_fps,
        }
    }

    /// Closes the current reporting interval.
    pub fn tick(&mut self, now: Instant) -> IntervalSummary {
        let elapsed = now.saturating_duration_since(self.start);
        let summary = IntervalSummary {
            total: self.total,
            interval_frames: self.interval,
            elapsed,
            average_fps: average_rate(self.total, elapsed),
        };
        self.interval = 0;
        summary
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

pub fn average_rate(frames: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        frames as f64 / secs
    } else {
        0.0
    }
}

/// Renders the console report line.
pub fn format_line(observation: &Observation, value: f64) -> String {
    format!(
        "[{:.1}s] Frame #{:04}: Avg = {:.2} | Instant FPS: {:.1}",
        observation.elapsed.as_secs_f64(),
        observation.sequence,
        value,
        observation.instant_fps
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_rate_follows_inter_arrival_gap() {
        let t0 = Instant::now();
        let mut counters = RateCounters::new(t0);

        assert_eq!(counters.observe(t0).instant_fps, 0.0);

        let second = counters.observe(t0 + Duration::from_millis(100));
        assert!((second.instant_fps - 10.0).abs() < 1e-9);

        let third = counters.observe(t0 + Duration::from_millis(150));
        assert!((third.instant_fps - 20.0).abs() < 1e-9);
        assert_eq!(third.sequence, 3);
    }

    #[test]
    fn non_monotonic_clock_yields_zero_rate() {
        let t0 = Instant::now() + Duration::from_secs(1);
        let mut counters = RateCounters::new(t0);
        counters.observe(t0);
        assert_eq!(counters.observe(t0).instant_fps, 0.0);
        assert_eq!(counters.observe(t0 - Duration::from_millis(10)).instant_fps, 0.0);
    }

    #[test]
    fn tick_resets_only_interval_count() {
        let t0 = Instant::now();
        let mut counters = RateCounters::new(t0);
        for i in 1..=4 {
            counters.observe(t0 + Duration::from_millis(i * 100));
        }

        let summary = counters.tick(t0 + Duration::from_secs(2));
        assert_eq!(summary.interval_frames, 4);
        assert_eq!(summary.total, 4);
        assert!((summary.average_fps - 2.0).abs() < 1e-9);

        counters.observe(t0 + Duration::from_millis(2100));
        let summary = counters.tick(t0 + Duration::from_secs(3));
        assert_eq!(summary.interval_frames, 1);
        assert_eq!(summary.total, 5);
    }

    #[test]
    fn line_format_is_padded_and_fixed_precision() {
        let obs = Observation {
            sequence: 7,
            elapsed: Duration::from_millis(1300),
            instant_fps: 29.97,
        };
        assert_eq!(
            format_line(&obs, 127.456),
            "[1.3s] Frame #0007: Avg = 127.46 | Instant FPS: 30.0"
        );
    }
}
