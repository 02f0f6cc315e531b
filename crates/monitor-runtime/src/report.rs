//! Per-run report.
//!
//! A [`RunReport`] summarizes one successful pipeline run and can be
//! persisted as JSON for later inspection.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use monitor_core::error::{Result, Stage};
use monitor_core::models::{Prediction, Strategy};
use serde::{Deserialize, Serialize};

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: f64,
}

/// Outcome of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub strategy: Strategy,
    pub threshold: f64,
    /// Name of the forecast model used.
    pub model: String,
    pub records_collected: usize,
    pub train_windows: usize,
    pub test_windows: usize,
    pub prediction: Prediction,
    /// Forecast revenue mapped back into source units.
    pub projected_revenue: Option<f64>,
    /// Mean squared error over the held-out test windows (normalized units).
    pub test_mse: Option<f64>,
    /// Timestamp of the newest observation the forecast builds on.
    pub latest_observation: Option<DateTime<Utc>>,
    pub stages: Vec<StageTiming>,
}

impl RunReport {
    /// `run-YYYYMMDDTHHMMSSZ.json`, from the start time.
    pub fn file_name(&self) -> String {
        format!("run-{}.json", self.started_at.format("%Y%m%dT%H%M%SZ"))
    }

    /// Atomically write the report to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Write the report into `dir` under [`file_name`](Self::file_name).
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Mean squared error between the leading predictions and `targets`.
///
/// Predictions beyond `targets` (the forecast window) are ignored. `None`
/// when there are no targets or not enough predictions to cover them.
pub fn test_mse(prediction: &Prediction, targets: &[f64]) -> Option<f64> {
    if targets.is_empty() || prediction.predicted_revenue.len() < targets.len() {
        return None;
    }
    let sum: f64 = prediction
        .predicted_revenue
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).powi(2))
        .sum();
    Some(sum / targets.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_report() -> RunReport {
        let started_at = Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).unwrap();
        RunReport {
            started_at,
            finished_at: started_at + chrono::Duration::seconds(2),
            strategy: Strategy::IncreasePricing,
            threshold: 0.8,
            model: "random_forest".to_string(),
            records_collected: 30,
            train_windows: 18,
            test_windows: 4,
            prediction: Prediction::from_series(vec![0.7, 0.9]),
            projected_revenue: Some(1250.0),
            test_mse: Some(0.01),
            latest_observation: Some(started_at - chrono::Duration::days(1)),
            stages: vec![StageTiming {
                stage: Stage::Collect,
                duration_ms: 1.5,
            }],
        }
    }

    #[test]
    fn test_file_name_uses_start_time() {
        assert_eq!(sample_report().file_name(), "run-20240501T063000Z.json");
    }

    #[test]
    fn test_save_in_and_load() {
        let tmp = TempDir::new().unwrap();
        let report = sample_report();

        let path = report.save_in(&tmp.path().join("reports")).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = RunReport::load_from(&path).unwrap();
        assert_eq!(loaded, report);
    }

    #[test]
    fn test_report_json_uses_strategy_label() {
        let json = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(json["strategy"], "Increase pricing");
        assert_eq!(json["stages"][0]["stage"], "collect");
    }

    #[test]
    fn test_mse_ignores_forecast_window() {
        let p = Prediction::from_series(vec![0.5, 1.0, 0.3]);
        let mse = test_mse(&p, &[0.5, 0.0]).unwrap();
        assert!((mse - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mse_without_targets() {
        let p = Prediction::from_series(vec![0.5]);
        assert!(test_mse(&p, &[]).is_none());
        assert!(test_mse(&Prediction::default(), &[1.0]).is_none());
    }
}
