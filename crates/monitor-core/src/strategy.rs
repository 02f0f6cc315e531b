//! Threshold rule mapping a revenue forecast to a pricing strategy.

use crate::config::PipelineConfig;
use crate::error::{MonitorError, Result};
use crate::models::{Prediction, Strategy};

/// Pure decision rule over a [`Prediction`].
pub struct StrategyDecider;

impl StrategyDecider {
    /// Pick a strategy for `prediction` under `config`.
    ///
    /// Pricing is increased only when the forecast revenue is strictly
    /// greater than `config.threshold`.
    pub fn decide(prediction: &Prediction, config: &PipelineConfig) -> Result<Strategy> {
        Self::decide_with_threshold(prediction, config.threshold)
    }

    /// Same as [`decide`](Self::decide) with an explicit threshold.
    pub fn decide_with_threshold(prediction: &Prediction, threshold: f64) -> Result<Strategy> {
        let revenue = prediction
            .revenue
            .ok_or_else(|| MonitorError::MissingField("revenue".to_string()))?;

        if revenue > threshold {
            Ok(Strategy::IncreasePricing)
        } else {
            Ok(Strategy::MaintainCurrentStrategy)
        }
    }
}
