pub mod capture;
pub mod collab;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod utils;

use std::path::Path;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use capture::{FrameDescriptor, OwnedFrame, SampleFormat};
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineStats};
pub use report::ReportSink;

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// Environment prefix for overrides, e.g. `MEANSTREAM__SOURCE__FPS=60`
pub const ENV_PREFIX: &str = "MEANSTREAM";

/// System configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: SampleFormat,
    pub summary_interval_ms: u64,
    /// Fixed seed for reproducible frames; entropy when unset
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub worker_threads: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub console: bool,
    pub metrics: bool,
    pub tick_interval_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
            format: SampleFormat::Gray8,
            summary_interval_ms: 1000,
            seed: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            queue_capacity: 4,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            console: true,
            metrics: false,
            tick_interval_ms: 1000,
        }
    }
}

impl Config {
    /// Layers an optional TOML file and `MEANSTREAM__*` variables over defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.source.validate()?;
        if self.pipeline.worker_threads == 0 {
            return Err(PipelineError::Config("worker_threads must be positive".into()));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(PipelineError::Config("queue_capacity must be positive".into()));
        }
        if self.report.tick_interval_ms == 0 {
            return Err(PipelineError::Config("tick_interval_ms must be positive".into()));
        }
        Ok(())
    }
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::Config(format!(
                "frame size {}x{} must be positive",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(PipelineError::Config("fps must be positive".into()));
        }
        if self.summary_interval_ms == 0 {
            return Err(PipelineError::Config("summary_interval_ms must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.source.fps, 30);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[source]\nwidth = 320\nheight = 240\nformat = \"Gray16\"\nseed = 11\n\n[pipeline]\nworker_threads = 1"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.source.width, 320);
        assert_eq!(config.source.height, 240);
        assert_eq!(config.source.format, SampleFormat::Gray16);
        assert_eq!(config.source.seed, Some(11));
        assert_eq!(config.source.fps, 30);
        assert_eq!(config.pipeline.worker_threads, 1);
        assert_eq!(config.pipeline.queue_capacity, 4);
    }

    #[test]
    fn invalid_file_values_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[source]\nfps = 0").unwrap();
        assert!(matches!(
            Config::load(Some(file.path())),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn env_overrides_use_double_underscore() {
        std::env::set_var("MEANSTREAM__REPORT__TICK_INTERVAL_MS", "250");
        let loaded = Config::load(None);
        std::env::remove_var("MEANSTREAM__REPORT__TICK_INTERVAL_MS");

        let config = loaded.unwrap();
        assert_eq!(config.report.tick_interval_ms, 250);
        assert_eq!(config.source.fps, 30);
    }

    #[test]
    fn global_config_swaps() {
        let mut config = Config::default();
        config.report.metrics = true;
        CONFIG.store(std::sync::Arc::new(config));
        assert!(CONFIG.load().report.metrics);
    }
}
