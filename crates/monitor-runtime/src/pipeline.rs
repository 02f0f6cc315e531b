//! Monetization pipeline orchestrator.
//!
//! Sequences the five stages of a run (collect, process, train, predict,
//! decide) over injected collaborators. Every stage reports its start and
//! outcome to a [`StageObserver`]; the first failure ends the run and is
//! returned tagged with its [`Stage`]. There is no retry and no partial
//! result: a run either yields a [`Strategy`] or a [`PipelineError`].

use std::time::Instant;

use chrono::Utc;
use monitor_core::config::PipelineConfig;
use monitor_core::error::{PipelineError, Result, Stage};
use monitor_core::forecast::{ForecastModel, ModelState};
use monitor_core::models::Strategy;
use monitor_core::strategy::StrategyDecider;
use monitor_data::collector::{DataCollector, FileCollector};
use monitor_data::processor::{DataProcessor, WindowProcessor};

use crate::forecaster::ForestForecaster;
use crate::observer::{StageObserver, TracingObserver};
use crate::report::{test_mse, RunReport, StageTiming};

// ── MonetizationPipeline ──────────────────────────────────────────────────────

/// Owns the collaborators of one pipeline and runs them in order.
pub struct MonetizationPipeline<M: ForecastModel = Box<dyn ForecastModel>> {
    collector: Box<dyn DataCollector>,
    processor: Box<dyn DataProcessor>,
    model: M,
    observer: Box<dyn StageObserver>,
}

impl MonetizationPipeline<ForestForecaster> {
    /// Pipeline over local files with the bundled forest model, logging
    /// through `tracing`.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Box::new(FileCollector::new()),
            Box::new(WindowProcessor::new(
                config.model_params.timesteps,
                config.test_ratio,
            )),
            ForestForecaster::new(config.model_params.clone()),
            Box::new(TracingObserver),
        )
    }
}

impl<M: ForecastModel> MonetizationPipeline<M> {
    pub fn new(
        collector: Box<dyn DataCollector>,
        processor: Box<dyn DataProcessor>,
        model: M,
        observer: Box<dyn StageObserver>,
    ) -> Self {
        Self {
            collector,
            processor,
            model,
            observer,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_state(&self) -> ModelState {
        self.model.state()
    }

    /// Run every stage and return the chosen strategy.
    pub fn run(&mut self, config: &PipelineConfig) -> std::result::Result<Strategy, PipelineError> {
        self.run_with_report(config).map(|report| report.strategy)
    }

    /// Run every stage and return the full [`RunReport`].
    pub fn run_with_report(
        &mut self,
        config: &PipelineConfig,
    ) -> std::result::Result<RunReport, PipelineError> {
        let started_at = Utc::now();
        let Self {
            collector,
            processor,
            model,
            observer,
        } = self;
        let mut runner = StageRunner {
            observer: observer.as_ref(),
            timings: Vec::with_capacity(Stage::ALL.len()),
        };

        let raw = runner.run(
            Stage::Collect,
            || collector.fetch(&config.data_sources),
            |raw| {
                format!(
                    "{} records from {} sources",
                    raw.record_count(),
                    raw.sources.len()
                )
            },
        )?;

        let processed = runner.run(
            Stage::Process,
            || processor.process(&raw),
            |data| {
                format!(
                    "{} train windows, {} test windows",
                    data.x_train.len(),
                    data.y_test.len()
                )
            },
        )?;

        let model_name = model.name().to_string();
        runner.run(
            Stage::Train,
            || {
                if model.state() == ModelState::Unbuilt {
                    model.build(&config.model_params)?;
                }
                model.train(&processed)
            },
            |_| format!("{model_name} model fitted on {} windows", processed.x_train.len()),
        )?;

        let prediction = runner.run(
            Stage::Predict,
            || model.predict(&processed),
            |p| match p.revenue {
                Some(r) => format!("forecast revenue {r:.4}"),
                None => "no forecast revenue".to_string(),
            },
        )?;

        let strategy = runner.run(
            Stage::Decide,
            || StrategyDecider::decide(&prediction, config),
            |s| format!("{s} (threshold {})", config.threshold),
        )?;

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            strategy,
            threshold: config.threshold,
            model: model_name,
            records_collected: raw.record_count(),
            train_windows: processed.x_train.len(),
            test_windows: processed.y_test.len(),
            projected_revenue: prediction
                .revenue
                .zip(processed.scale)
                .map(|(r, scale)| scale.denormalize(r)),
            test_mse: test_mse(&prediction, &processed.y_test),
            latest_observation: processed.latest_timestamp,
            prediction,
            stages: runner.timings,
        })
    }
}

// ── StageRunner ───────────────────────────────────────────────────────────────

/// Wraps each stage with observer notifications and timing.
struct StageRunner<'a> {
    observer: &'a dyn StageObserver,
    timings: Vec<StageTiming>,
}

impl StageRunner<'_> {
    fn run<T>(
        &mut self,
        stage: Stage,
        work: impl FnOnce() -> Result<T>,
        summarize: impl FnOnce(&T) -> String,
    ) -> std::result::Result<T, PipelineError> {
        self.observer.on_start(stage);
        let start = Instant::now();
        let outcome = work();
        self.timings.push(StageTiming {
            stage,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        });

        match outcome {
            Ok(value) => {
                self.observer.on_success(stage, &summarize(&value));
                Ok(value)
            }
            Err(error) => {
                self.observer.on_failure(stage, &error);
                Err(PipelineError::new(stage, error))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
