//! Processing stage: [`RawDataset`] in, model-ready windows out.
//!
//! [`WindowProcessor`] runs in five steps:
//!
//! 1. Extract `(timestamp, value)` pairs from every record of every source.
//! 2. Sum values sharing a timestamp across sources and order chronologically.
//! 3. Min-max normalize the series into `[0, 1]`.
//! 4. Slide a window of `timesteps` values over the series, the next value
//!    being the target.
//! 5. Split chronologically into train and test windows and append the
//!    forecast window (the newest `timesteps` values) to `x_test`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use monitor_core::data_processors::{FieldLookup, TimestampProcessor, ValueExtractor};
use monitor_core::error::{MonitorError, Result};
use monitor_core::models::{MinMaxScale, ProcessedDataset, RawDataset, RawRecord};

/// Pure transformation from raw records to model-ready tensors.
pub trait DataProcessor {
    fn process(&self, raw: &RawDataset) -> Result<ProcessedDataset>;
}

// ── WindowProcessor ───────────────────────────────────────────────────────────

/// Sliding-window processor for a single aggregated revenue series.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowProcessor {
    timesteps: usize,
    test_ratio: f64,
}

impl WindowProcessor {
    /// `timesteps` must match the model's input width; `test_ratio` is the
    /// share of windows held out for evaluation.
    pub fn new(timesteps: usize, test_ratio: f64) -> Self {
        Self {
            timesteps,
            test_ratio,
        }
    }

    /// Merge all sources into one chronologically ordered series.
    pub fn aggregate(&self, raw: &RawDataset) -> Result<BTreeMap<DateTime<Utc>, f64>> {
        let mut series: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();

        for (name, batch) in &raw.sources {
            for (index, record) in batch.records.iter().enumerate() {
                let (ts, value) =
                    extract_observation(record, &batch.timestamp_field, &batch.value_field)
                        .map_err(|reason| MonitorError::MalformedRecord {
                            source_name: name.clone(),
                            index,
                            reason,
                        })?;
                *series.entry(ts).or_insert(0.0) += value;
            }
        }

        Ok(series)
    }
}

impl DataProcessor for WindowProcessor {
    fn process(&self, raw: &RawDataset) -> Result<ProcessedDataset> {
        let series = self.aggregate(raw)?;

        let required = self.timesteps + 1;
        if series.len() < required {
            return Err(MonitorError::InsufficientData {
                required,
                available: series.len(),
            });
        }

        let latest_timestamp = series.keys().next_back().copied();
        let values: Vec<f64> = series.into_values().collect();
        let scale = MinMaxScale::fit(&values);
        let normalized: Vec<f64> = match scale {
            Some(s) => values.iter().map(|&v| s.normalize(v)).collect(),
            None => values,
        };

        let window_count = normalized.len() - self.timesteps;
        let test_count = (window_count as f64 * self.test_ratio).floor() as usize;
        let train_count = window_count - test_count;

        let mut dataset = ProcessedDataset {
            scale,
            latest_timestamp,
            ..Default::default()
        };

        for start in 0..window_count {
            let window = normalized[start..start + self.timesteps].to_vec();
            let target = normalized[start + self.timesteps];
            if start < train_count {
                dataset.x_train.push(window);
                dataset.y_train.push(target);
            } else {
                dataset.x_test.push(window);
                dataset.y_test.push(target);
            }
        }

        let forecast_start = normalized.len() - self.timesteps;
        dataset
            .x_test
            .push(normalized[forecast_start..].to_vec());

        tracing::debug!(
            observations = normalized.len(),
            train_windows = dataset.x_train.len(),
            test_windows = dataset.y_test.len(),
            "series windowed"
        );

        Ok(dataset)
    }
}

/// Read the timestamp and value of one record, describing any violation.
fn extract_observation(
    record: &RawRecord,
    timestamp_field: &str,
    value_field: &str,
) -> std::result::Result<(DateTime<Utc>, f64), String> {
    let raw_ts = FieldLookup::get(record, timestamp_field)
        .ok_or_else(|| format!("missing field '{timestamp_field}'"))?;
    let ts = TimestampProcessor::parse(raw_ts)
        .ok_or_else(|| format!("unparsable timestamp {raw_ts} in '{timestamp_field}'"))?;

    let raw_value = FieldLookup::get(record, value_field)
        .ok_or_else(|| format!("missing field '{value_field}'"))?;
    let value = ValueExtractor::parse(raw_value)
        .ok_or_else(|| format!("non-numeric value {raw_value} in '{value_field}'"))?;

    Ok((ts, value))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core::models::SourceBatch;
    use serde_json::{json, Value};

    fn batch(records: Vec<Value>) -> SourceBatch {
        SourceBatch {
            timestamp_field: "timestamp".to_string(),
            value_field: "revenue".to_string(),
            records: records
                .into_iter()
                .map(|v| match v {
                    Value::Object(map) => map,
                    _ => panic!("record fixture must be an object"),
                })
                .collect(),
        }
    }

    fn daily(values: &[f64]) -> SourceBatch {
        batch(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| json!({"timestamp": format!("2024-01-{:02}", i + 1), "revenue": v}))
                .collect(),
        )
    }

    fn raw(sources: Vec<(&str, SourceBatch)>) -> RawDataset {
        let mut raw = RawDataset::default();
        for (name, b) in sources {
            raw.sources.insert(name.to_string(), b);
        }
        raw
    }

    #[test]
    fn test_windows_and_split() {
        // 10 observations, 3 timesteps → 7 windows; 20% → 1 test window.
        let values: Vec<f64> = (0..10).map(|v| v as f64).collect();
        let data = WindowProcessor::new(3, 0.2)
            .process(&raw(vec![("subs", daily(&values))]))
            .unwrap();

        assert_eq!(data.x_train.len(), 6);
        assert_eq!(data.y_train.len(), 6);
        assert_eq!(data.y_test.len(), 1);
        assert_eq!(data.x_test.len(), 2);
        assert!(data.x_train.iter().chain(&data.x_test).all(|w| w.len() == 3));

        // Normalized by (v - 0) / 9.
        let n = |v: f64| v / 9.0;
        assert_eq!(data.x_train[0], vec![n(0.0), n(1.0), n(2.0)]);
        assert!((data.y_train[0] - n(3.0)).abs() < 1e-12);
        assert!((data.y_test[0] - n(9.0)).abs() < 1e-12);
        assert_eq!(data.x_test[1], vec![n(7.0), n(8.0), n(9.0)]);

        let scale = data.scale.unwrap();
        assert_eq!((scale.min, scale.max), (0.0, 9.0));
        assert_eq!(
            data.latest_timestamp.unwrap().format("%Y-%m-%d").to_string(),
            "2024-01-10"
        );
    }

    #[test]
    fn test_zero_test_ratio_keeps_only_forecast_window() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let data = WindowProcessor::new(2, 0.0)
            .process(&raw(vec![("subs", daily(&values))]))
            .unwrap();
        assert_eq!(data.x_train.len(), 3);
        assert!(data.y_test.is_empty());
        assert_eq!(data.x_test.len(), 1);
    }

    #[test]
    fn test_sources_summed_per_timestamp() {
        let data = WindowProcessor::new(1, 0.0)
            .process(&raw(vec![
                ("subs", daily(&[1.0, 2.0, 3.0])),
                ("ads", daily(&[1.0, 0.0, 5.0])),
            ]))
            .unwrap();

        // Combined series: 2, 2, 8 → normalized 0, 0, 1.
        assert_eq!(data.x_train, vec![vec![0.0], vec![0.0]]);
        assert_eq!(data.y_train, vec![0.0, 1.0]);
        assert_eq!(data.x_test, vec![vec![1.0]]);
    }

    #[test]
    fn test_records_ordered_chronologically() {
        let b = batch(vec![
            json!({"timestamp": "2024-01-03", "revenue": 30}),
            json!({"timestamp": "2024-01-01", "revenue": 10}),
            json!({"timestamp": "2024-01-02", "revenue": 20}),
        ]);
        let data = WindowProcessor::new(1, 0.0)
            .process(&raw(vec![("subs", b)]))
            .unwrap();
        assert_eq!(data.y_train, vec![0.5, 1.0]);
    }

    #[test]
    fn test_string_values_and_nested_fields() {
        let b = SourceBatch {
            timestamp_field: "meta.day".to_string(),
            value_field: "amount".to_string(),
            records: batch(vec![
                json!({"meta": {"day": "2024-01-01"}, "amount": "$1,000"}),
                json!({"meta": {"day": "2024-01-02"}, "amount": "2000"}),
            ])
            .records,
        };
        let data = WindowProcessor::new(1, 0.0)
            .process(&raw(vec![("subs", b)]))
            .unwrap();
        let scale = data.scale.unwrap();
        assert_eq!((scale.min, scale.max), (1000.0, 2000.0));
    }

    #[test]
    fn test_missing_value_field_is_malformed() {
        let b = batch(vec![
            json!({"timestamp": "2024-01-01", "revenue": 1}),
            json!({"timestamp": "2024-01-02"}),
        ]);
        let err = WindowProcessor::new(1, 0.0)
            .process(&raw(vec![("subs", b)]))
            .unwrap_err();
        match err {
            MonitorError::MalformedRecord {
                source_name,
                index,
                reason,
            } => {
                assert_eq!(source_name, "subs");
                assert_eq!(index, 1);
                assert!(reason.contains("missing field 'revenue'"));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_timestamp_is_malformed() {
        let b = batch(vec![json!({"timestamp": "yesterday", "revenue": 1})]);
        let err = WindowProcessor::new(1, 0.0)
            .process(&raw(vec![("subs", b)]))
            .unwrap_err();
        assert!(err.to_string().contains("unparsable timestamp"));
    }

    #[test]
    fn test_non_numeric_value_is_malformed() {
        let b = batch(vec![json!({"timestamp": "2024-01-01", "revenue": "lots"})]);
        let err = WindowProcessor::new(1, 0.0)
            .process(&raw(vec![("subs", b)]))
            .unwrap_err();
        assert!(err.to_string().contains("non-numeric value"));
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let err = WindowProcessor::new(5, 0.2)
            .process(&raw(vec![("subs", daily(&[1.0, 2.0, 3.0]))]))
            .unwrap_err();
        assert!(matches!(
            err,
            MonitorError::InsufficientData {
                required: 6,
                available: 3
            }
        ));
    }

    #[test]
    fn test_process_is_deterministic() {
        let input = raw(vec![("subs", daily(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0]))]);
        let processor = WindowProcessor::new(2, 0.25);
        assert_eq!(
            processor.process(&input).unwrap(),
            processor.process(&input).unwrap()
        );
    }
}
