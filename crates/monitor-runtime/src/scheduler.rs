//! Periodic pipeline execution.
//!
//! [`PipelineScheduler`] repeats [`run_once`] on a fixed interval until a
//! shutdown future resolves. Runs never overlap: the next tick is awaited
//! only after the previous run has finished, and ticks missed while a run
//! was in progress are skipped rather than replayed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use monitor_core::config::PipelineConfig;
use tokio::time::{self, MissedTickBehavior};

use crate::runner::{run_once, RunOptions};

/// Counts of what a scheduled session did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub runs: usize,
    pub failures: usize,
}

// ── PipelineScheduler ─────────────────────────────────────────────────────────

pub struct PipelineScheduler {
    interval: Duration,
    config: Arc<PipelineConfig>,
    options: Arc<RunOptions>,
}

impl PipelineScheduler {
    pub fn new(interval_secs: u64, config: PipelineConfig, options: RunOptions) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            config: Arc::new(config),
            options: Arc::new(options),
        }
    }

    /// Run immediately, then once per interval, until `shutdown` resolves.
    ///
    /// A failed run is logged and the schedule continues. A run already in
    /// progress when `shutdown` resolves is allowed to finish.
    pub async fn run_until<F>(self, shutdown: F) -> ScheduleSummary
    where
        F: Future<Output = ()>,
    {
        let mut summary = ScheduleSummary::default();
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!(runs = summary.runs, "shutdown requested; stopping schedule");
                    break;
                }
                _ = interval.tick() => {
                    summary.runs += 1;
                    if !self.execute(summary.runs).await {
                        summary.failures += 1;
                    }
                }
            }
        }

        summary
    }

    /// One run on the blocking pool. Returns whether it succeeded.
    async fn execute(&self, run: usize) -> bool {
        let config = Arc::clone(&self.config);
        let options = Arc::clone(&self.options);

        let outcome = tokio::task::spawn_blocking(move || run_once(&config, &options)).await;

        match outcome {
            Ok(Ok(report)) => {
                tracing::info!(run, strategy = %report.strategy, "scheduled run complete");
                true
            }
            Ok(Err(e)) => {
                tracing::error!(run, error = %e, "scheduled run failed");
                false
            }
            Err(e) => {
                tracing::error!(run, error = %e, "scheduled run panicked");
                false
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
