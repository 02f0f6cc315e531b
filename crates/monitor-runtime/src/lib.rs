//! Runtime layer for the monetization monitor.
//!
//! Hosts the bundled forecast model, the stage-by-stage pipeline
//! orchestrator, run reports, and the one-shot and scheduled runners used by
//! the binary.

pub mod forecaster;
pub mod observer;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod scheduler;

pub use forecaster::ForestForecaster;
pub use pipeline::MonetizationPipeline;
pub use runner::{run_once, RunError, RunOptions};
pub use scheduler::{PipelineScheduler, ScheduleSummary};

pub use monitor_core as core;
pub use monitor_data as data;
