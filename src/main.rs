//! Meanstream: simulated camera → mean-intensity pipeline → console

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use meanstream::capture::FrameSimulator;
use meanstream::pipeline::WorkerPool;
use meanstream::report::{ConsoleSink, Fanout, MetricsSink};
use meanstream::{Config, Pipeline};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("meanstream=info"));
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::uptime());

    let registry = tracing_subscriber::registry().with(filter).with(fmt);
    #[cfg(feature = "profiling")]
    let registry = registry.with(tracing_tracy::TracyLayer::default());
    registry.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    init_tracing();

    info!("Meanstream launching...");

    // Load configuration
    let path = std::env::var_os("MEANSTREAM_CONFIG").map(PathBuf::from);
    let config = Config::load(path.as_deref())?;
    meanstream::CONFIG.store(Arc::new(config.clone()));

    // Report sinks
    let console = Arc::new(ConsoleSink::stdout());
    let mut sinks = Fanout::new();
    if config.report.console {
        sinks = sinks.with(console.clone());
    }
    if config.report.metrics {
        sinks = sinks.with(Arc::new(MetricsSink));
    }

    let pool = Arc::new(WorkerPool::new(&config.pipeline)?);
    let pipeline = Arc::new(
        Pipeline::builder()
            .sink(Arc::new(sinks))
            .dispatch(pool.clone())
            .build()?,
    );

    let source = FrameSimulator::new(config.source.clone())?.start(pipeline.clone());

    // Sink-side interval summaries
    let tick_every = Duration::from_millis(config.report.tick_interval_ms);
    let ticker = tokio::spawn(async move {
        let mut timer = tokio::time::interval(tick_every);
        timer.tick().await;
        loop {
            timer.tick().await;
            console.tick();
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Stop requested");

    let summary = source.stop().await?;
    ticker.abort();

    if !pipeline.idle_within(Duration::from_secs(1)).await {
        info!("Worker still running at shutdown");
    }
    // Joins the worker threads
    let workers = pool.clone();
    tokio::task::spawn_blocking(move || workers.shutdown()).await?;

    let stats = pipeline.stats();
    info!(
        "Sent {} frames in {:.1}s ({:.1} fps); completed {}, dropped {} ({:.0}%), failed {}",
        summary.frames_sent,
        summary.elapsed.as_secs_f64(),
        summary.average_fps,
        stats.completed,
        stats.dropped_busy,
        stats.drop_ratio() * 100.0,
        stats.compute_failures + stats.dispatch_failures
    );

    info!("Meanstream shutting down");
    Ok(())
}
