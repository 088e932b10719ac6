//! Report sinks: consumers of completed frame statistics

use std::io::Write;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use super::rate::{format_line, IntervalSummary, RateCounters};
use crate::utils::{Clock, SystemClock};

/// Anything that can observe a stream of frame means.
///
/// Calls may arrive from different worker threads over the sink's lifetime.
pub trait ReportSink: Send + Sync {
    fn report(&self, value: f64);
}

impl<S: ReportSink + ?Sized> ReportSink for Arc<S> {
    fn report(&self, value: f64) {
        (**self).report(value)
    }
}

struct ConsoleState<W> {
    counters: RateCounters,
    out: W,
}

/// Writes one line per report and tracks frame rate
pub struct ConsoleSink<W: Write + Send = std::io::Stdout> {
    state: Mutex<ConsoleState<W>>,
    clock: Arc<dyn Clock>,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout(), Arc::new(SystemClock))
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, clock: Arc<dyn Clock>) -> Self {
        let counters = RateCounters::new(clock.now());
        Self {
            state: Mutex::new(ConsoleState { counters, out }),
            clock,
        }
    }

    /// Closes the reporting interval and logs the summary.
    pub fn tick(&self) -> IntervalSummary {
        let now = self.clock.now();
        let summary = self.lock().counters.tick(now);
        info!(
            "Sink: {} frames total, {} in last interval, avg {:.1} fps",
            summary.total, summary.interval_frames, summary.average_fps
        );
        summary
    }

    pub fn frames_reported(&self) -> u64 {
        self.lock().counters.total()
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.state
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
            .out
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ConsoleState<W>> {
        // Counters stay consistent even if a writer panicked mid-line
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> ReportSink for ConsoleSink<W> {
    fn report(&self, value: f64) {
        let now = self.clock.now();
        let mut state = self.lock();
        let observation = state.counters.observe(now);
        let line = format_line(&observation, value);
        if let Err(e) = writeln!(state.out, "{}", line) {
            debug!("Failed to write report line: {}", e);
        }
    }
}

/// Keeps every reported value in arrival order
#[derive(Default)]
pub struct MemorySink {
    values: Mutex<Vec<f64>>,
    arrived: Condvar,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> Vec<f64> {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocks until at least `count` values arrived or `timeout` elapsed.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let guard = self.values.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = self
            .arrived
            .wait_timeout_while(guard, timeout, |values| values.len() < count)
            .unwrap_or_else(|e| e.into_inner());
        guard.len() >= count
    }
}

impl ReportSink for MemorySink {
    fn report(&self, value: f64) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(value);
        self.arrived.notify_all();
    }
}

/// Exports reports through the `metrics` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsSink;

impl ReportSink for MetricsSink {
    fn report(&self, value: f64) {
        metrics::gauge!("meanstream_frame_mean").set(value);
        metrics::counter!("meanstream_frames_reported_total").increment(1);
    }
}

/// Forwards each report to every inner sink, in order
#[derive(Default, Clone)]
pub struct Fanout {
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl ReportSink for Fanout {
    fn report(&self, value: f64) {
        for sink in &self.sinks {
            sink.report(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ManualClock;

    fn console(clock: &ManualClock) -> ConsoleSink<Vec<u8>> {
        ConsoleSink::new(Vec::new(), Arc::new(clock.clone()))
    }

    #[test]
    fn console_sink_renders_rate_from_synthetic_timestamps() {
        let clock = ManualClock::new();
        let sink = console(&clock);

        sink.report(100.0);
        clock.advance(Duration::from_millis(100));
        sink.report(101.5);
        clock.advance(Duration::from_millis(50));
        sink.report(99.0);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[0.0s] Frame #0001: Avg = 100.00 | Instant FPS: 0.0",
                "[0.1s] Frame #0002: Avg = 101.50 | Instant FPS: 10.0",
                "[0.1s] Frame #0003: Avg = 99.00 | Instant FPS: 20.0",
            ]
        );
    }

    #[test]
    fn console_sink_tick_counts_interval() {
        let clock = ManualClock::new();
        let sink = console(&clock);
        sink.report(1.0);
        sink.report(2.0);
        clock.advance(Duration::from_secs(1));

        let summary = sink.tick();
        assert_eq!(summary.interval_frames, 2);
        assert_eq!(sink.tick().interval_frames, 0);
        assert_eq!(sink.frames_reported(), 2);
    }

    #[test]
    fn memory_sink_keeps_arrival_order() {
        let sink = MemorySink::new();
        for v in [3.0, 1.0, 2.0] {
            sink.report(v);
        }
        assert_eq!(sink.values(), vec![3.0, 1.0, 2.0]);
        assert!(sink.wait_for(3, Duration::from_millis(1)));
        assert!(!sink.wait_for(4, Duration::from_millis(1)));
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let a = Arc::new(MemorySink::new());
        let b = Arc::new(MemorySink::new());
        let fanout = Fanout::new().with(a.clone()).with(b.clone());
        fanout.report(42.0);
        assert_eq!(a.values(), vec![42.0]);
        assert_eq!(b.values(), vec![42.0]);
    }
}
