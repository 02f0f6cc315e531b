//! Capability contract for forecast models.
//!
//! The pipeline only ever talks to a model through [`ForecastModel`]; any
//! regressor that can be built from [`ModelParams`], fitted on a
//! [`ProcessedDataset`] and asked for a [`Prediction`] can be plugged in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ModelParams;
use crate::error::Result;
use crate::models::{Prediction, ProcessedDataset};

/// Lifecycle of a model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Unbuilt,
    Built,
    Trained,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelState::Unbuilt => "unbuilt",
            ModelState::Built => "built",
            ModelState::Trained => "trained",
        };
        f.write_str(s)
    }
}

/// Minimal build / train / predict contract.
pub trait ForecastModel {
    /// Short model name for logs and reports.
    fn name(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> ModelState;

    /// Construct the architecture.
    ///
    /// Fails with [`MonitorError::Configuration`](crate::error::MonitorError::Configuration)
    /// when `params` cannot describe a valid architecture.
    fn build(&mut self, params: &ModelParams) -> Result<()>;

    /// Fit on `x_train` / `y_train`, building first when unbuilt.
    ///
    /// Fails with [`MonitorError::Training`](crate::error::MonitorError::Training)
    /// on unusable data. A failed call leaves the model as it was.
    fn train(&mut self, data: &ProcessedDataset) -> Result<()>;

    /// Predict one value per `x_test` window.
    ///
    /// Fails with [`MonitorError::Precondition`](crate::error::MonitorError::Precondition)
    /// unless the model is trained.
    fn predict(&self, data: &ProcessedDataset) -> Result<Prediction>;
}

impl<M: ForecastModel + ?Sized> ForecastModel for Box<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn state(&self) -> ModelState {
        (**self).state()
    }

    fn build(&mut self, params: &ModelParams) -> Result<()> {
        (**self).build(params)
    }

    fn train(&mut self, data: &ProcessedDataset) -> Result<()> {
        (**self).train(data)
    }

    fn predict(&self, data: &ProcessedDataset) -> Result<Prediction> {
        (**self).predict(data)
    }
}
