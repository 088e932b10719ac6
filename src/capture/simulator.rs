//! Synthetic frame source driven by tokio timers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{info, instrument, warn};

use crate::capture::frame::FrameDescriptor;
use crate::error::PipelineError;
use crate::report::rate::average_rate;
use crate::{Pipeline, SourceConfig};

/// Final source-side totals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSummary {
    pub frames_sent: u64,
    pub elapsed: Duration,
    pub average_fps: f64,
}

/// Generates random frames at a fixed cadence
pub struct FrameSimulator {
    config: SourceConfig,
}

/// Running simulator. Dropping the handle also ends generation.
pub struct SimulatorHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<SourceSummary>,
    sent: Arc<AtomicU64>,
}

impl FrameSimulator {
    #[instrument]
    pub fn new(config: SourceConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        info!(
            "Simulating {}x{} {:?} frames at {} fps",
            config.width, config.height, config.format, config.fps
        );
        Ok(Self { config })
    }

    /// Spawns the generation loop on the current tokio runtime.
    pub fn start(self, pipeline: Arc<Pipeline>) -> SimulatorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let sent = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(run(self.config, pipeline, stop_rx, sent.clone()));
        SimulatorHandle {
            stop_tx,
            task,
            sent,
        }
    }
}

impl SimulatorHandle {
    pub fn frames_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Halts generation and summaries. An in-flight worker is left to finish.
    pub async fn stop(self) -> Result<SourceSummary, PipelineError> {
        let _ = self.stop_tx.send(true);
        self.task
            .await
            .map_err(|e| PipelineError::SourceTask(e.to_string()))
    }
}

async fn run(
    config: SourceConfig,
    pipeline: Arc<Pipeline>,
    mut stop_rx: watch::Receiver<bool>,
    sent: Arc<AtomicU64>,
) -> SourceSummary {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // One buffer, overwritten per frame, like a driver's ring slot
    let len = config.width as usize * config.height as usize * config.format.bytes_per_sample();
    let mut buffer = vec![0u8; len];

    let mut frame_timer = interval(Duration::from_secs_f64(1.0 / config.fps as f64));
    frame_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let period = Duration::from_millis(config.summary_interval_ms);
    let start = Instant::now();
    let mut summary_timer = interval_at(start + period, period);

    let mut total = 0u64;
    let mut in_interval = 0u64;

    loop {
        tokio::select! {
            biased;

            _ = stop_rx.changed() => break,

            _ = frame_timer.tick() => {
                rng.fill(&mut buffer[..]);
                let frame = FrameDescriptor::new(&buffer, config.width, config.height)
                    .with_format(config.format);
                if let Err(e) = pipeline.deliver(frame) {
                    warn!("Frame delivery failed: {}", e);
                }
                total += 1;
                in_interval += 1;
                sent.store(total, Ordering::Relaxed);
            }

            _ = summary_timer.tick() => {
                info!(
                    "Source: {} frames sent, {} in last interval, avg {:.1} fps",
                    total,
                    in_interval,
                    average_rate(total, start.elapsed())
                );
                in_interval = 0;
            }
        }
    }

    let elapsed = start.elapsed();
    let summary = SourceSummary {
        frames_sent: total,
        elapsed,
        average_fps: average_rate(total, elapsed),
    };
    info!(
        "Source stopped: {} frames in {:.2}s, avg {:.1} fps",
        summary.frames_sent,
        summary.elapsed.as_secs_f64(),
        summary.average_fps
    );
    summary
}
