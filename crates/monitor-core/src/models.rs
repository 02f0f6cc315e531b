use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single collected record: a flat JSON object as read from the source.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

// ── RawDataset ────────────────────────────────────────────────────────────────

/// Records collected from one source, together with the field names the
/// processor should read from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBatch {
    /// Name of the field holding the observation timestamp.
    pub timestamp_field: String,
    /// Name of the field holding the revenue value.
    pub value_field: String,
    /// Records in source order.
    pub records: Vec<RawRecord>,
}

/// Output of the collection stage, keyed by source name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    pub sources: BTreeMap<String, SourceBatch>,
}

impl RawDataset {
    /// Total number of records across all sources.
    pub fn record_count(&self) -> usize {
        self.sources.values().map(|b| b.records.len()).sum()
    }
}

// ── ProcessedDataset ──────────────────────────────────────────────────────────

/// Min-max scaling applied to the revenue series before windowing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScale {
    pub min: f64,
    pub max: f64,
}

impl MinMaxScale {
    /// Fit the scale to `values`. Returns `None` for an empty slice.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;
        let (min, max) = values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(Self { min, max })
    }

    /// Map `value` into `[0, 1]`. A constant series maps to `0`.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= f64::EPSILON {
            0.0
        } else {
            (value - self.min) / span
        }
    }

    /// Map a normalized value back into source units.
    pub fn denormalize(&self, value: f64) -> f64 {
        self.min + value * (self.max - self.min)
    }
}

/// Model-ready tensors produced by the processing stage.
///
/// `x_test` always ends with the forecast window (the most recent
/// observations), which has no target, so `y_test.len() + 1 == x_test.len()`
/// for datasets built by the bundled processor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedDataset {
    pub x_train: Vec<Vec<f64>>,
    pub y_train: Vec<f64>,
    pub x_test: Vec<Vec<f64>>,
    pub y_test: Vec<f64>,
    /// Scale used to normalize the series, when one was applied.
    pub scale: Option<MinMaxScale>,
    /// Timestamp of the newest observation.
    pub latest_timestamp: Option<DateTime<Utc>>,
}

// ── Prediction ────────────────────────────────────────────────────────────────

/// Output of the predict stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Normalized forecast for the next period, absent when nothing was predicted.
    pub revenue: Option<f64>,
    /// One normalized prediction per `x_test` window.
    pub predicted_revenue: Vec<f64>,
}

impl Prediction {
    /// Build a prediction whose `revenue` is the last (forecast-window) value.
    pub fn from_series(predicted_revenue: Vec<f64>) -> Self {
        Self {
            revenue: predicted_revenue.last().copied(),
            predicted_revenue,
        }
    }
}

// ── Strategy ──────────────────────────────────────────────────────────────────

/// Discrete pricing action chosen by the decision stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "Increase pricing")]
    IncreasePricing,
    #[serde(rename = "Maintain current strategy")]
    MaintainCurrentStrategy,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::IncreasePricing, Strategy::MaintainCurrentStrategy];

    /// Human-readable strategy label.
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::IncreasePricing => "Increase pricing",
            Strategy::MaintainCurrentStrategy => "Maintain current strategy",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_fit_and_normalize() {
        let scale = MinMaxScale::fit(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(scale.min, 10.0);
        assert_eq!(scale.max, 30.0);
        assert!((scale.normalize(20.0) - 0.5).abs() < 1e-12);
        assert!((scale.denormalize(0.5) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_constant_series_maps_to_zero() {
        let scale = MinMaxScale::fit(&[5.0, 5.0]).unwrap();
        assert_eq!(scale.normalize(5.0), 0.0);
    }

    #[test]
    fn test_scale_empty() {
        assert!(MinMaxScale::fit(&[]).is_none());
    }

    #[test]
    fn test_prediction_revenue_is_last_value() {
        let p = Prediction::from_series(vec![0.1, 0.2, 0.9]);
        assert_eq!(p.revenue, Some(0.9));
        assert!(Prediction::from_series(vec![]).revenue.is_none());
    }

    #[test]
    fn test_strategy_labels() {
        assert_eq!(Strategy::IncreasePricing.to_string(), "Increase pricing");
        assert_eq!(
            Strategy::MaintainCurrentStrategy.to_string(),
            "Maintain current strategy"
        );
        let json = serde_json::to_string(&Strategy::IncreasePricing).unwrap();
        assert_eq!(json, "\"Increase pricing\"");
    }

    #[test]
    fn test_raw_dataset_record_count() {
        let mut raw = RawDataset::default();
        raw.sources.insert(
            "a".to_string(),
            SourceBatch {
                records: vec![RawRecord::new(), RawRecord::new()],
                ..Default::default()
            },
        );
        raw.sources.insert("b".to_string(), SourceBatch::default());
        assert_eq!(raw.record_count(), 2);
    }
}
