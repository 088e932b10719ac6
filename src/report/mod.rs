pub mod rate;
pub mod sink;

pub use rate::{IntervalSummary, Observation, RateCounters};
pub use sink::{ConsoleSink, Fanout, MemorySink, MetricsSink, ReportSink};
