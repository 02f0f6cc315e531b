//! One complete pipeline run plus its side outputs.
//!
//! [`run_once`] builds a fresh pipeline from the configuration, runs it and
//! persists the optional artefacts (run report, trained model).

use std::path::PathBuf;

use monitor_core::config::PipelineConfig;
use monitor_core::error::{MonitorError, PipelineError};
use thiserror::Error;

use crate::pipeline::MonetizationPipeline;
use crate::report::RunReport;

/// Where a run writes its artefacts. Both are optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Directory receiving one `run-*.json` report per run.
    pub report_dir: Option<PathBuf>,
    /// File receiving the trained model.
    pub model_out: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Failed to persist run output: {0}")]
    Persist(#[source] MonitorError),
}

/// Run the pipeline once and persist its outputs.
///
/// Persistence happens only after the pipeline succeeds; a failed run writes
/// nothing.
pub fn run_once(config: &PipelineConfig, options: &RunOptions) -> Result<RunReport, RunError> {
    let mut pipeline = MonetizationPipeline::from_config(config);
    let report = pipeline.run_with_report(config)?;

    if let Some(dir) = &options.report_dir {
        let path = report.save_in(dir).map_err(RunError::Persist)?;
        tracing::info!(path = %path.display(), "run report written");
    }

    if let Some(path) = &options.model_out {
        pipeline.model().save_to(path).map_err(RunError::Persist)?;
        tracing::info!(path = %path.display(), "model written");
    }

    Ok(report)
}
