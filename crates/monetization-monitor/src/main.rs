mod bootstrap;

use anyhow::{Context, Result};
use monitor_core::config::PipelineConfig;
use monitor_core::settings::Settings;
use monitor_runtime::runner::{run_once, RunOptions};
use monitor_runtime::scheduler::PipelineScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("Monetization Monitor v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match load_config(&settings) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{:#}", e);
            return Err(e);
        }
    };
    tracing::info!(
        "Sources: {}, threshold: {}, timesteps: {}",
        config.data_sources.len(),
        config.threshold,
        config.model_params.timesteps
    );

    let options = RunOptions {
        report_dir: settings.report_dir.clone(),
        model_out: settings.model_out.clone(),
    };

    match settings.interval_secs {
        Some(secs) => {
            tracing::info!("Running every {}s; press Ctrl+C to stop", secs);

            let scheduler = PipelineScheduler::new(secs, config, options);
            let summary = scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!(error = %e, "failed to listen for Ctrl+C");
                    }
                })
                .await;

            tracing::info!(
                "Stopped after {} runs ({} failed)",
                summary.runs,
                summary.failures
            );
        }

        None => {
            let outcome = tokio::task::spawn_blocking(move || run_once(&config, &options))
                .await
                .context("pipeline task panicked")?;

            match outcome {
                Ok(report) => {
                    tracing::info!("Recommended strategy: {}", report.strategy);
                    tracing::info!("System is running normally");
                    println!("{}", report.strategy);
                }
                Err(e) => {
                    tracing::error!("Pipeline run failed: {}", e);
                    return Err(e).context("pipeline run failed");
                }
            }
        }
    }

    Ok(())
}

/// Load the configuration file and apply the CLI threshold override.
fn load_config(settings: &Settings) -> Result<PipelineConfig> {
    let config = PipelineConfig::from_file(&settings.config)
        .with_context(|| format!("loading configuration from {}", settings.config.display()))?;

    match settings.threshold {
        Some(threshold) => config
            .with_threshold(threshold)
            .context("applying --threshold override"),
        None => Ok(config),
    }
}
