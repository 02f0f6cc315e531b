//! Bundled forecast model.
//!
//! [`ForestForecaster`] fits a smartcore random forest regressor that maps a
//! window of `timesteps` normalized values to the next value. The configured
//! model parameters map onto the forest as follows:
//!
//! | parameter    | forest setting                      |
//! |--------------|-------------------------------------|
//! | `epochs`     | number of trees (one bootstrap round each) |
//! | `units`      | maximum tree depth                  |
//! | `batch_size` | minimum windows required to split a node |
//! | `seed`       | bootstrap and feature sampling seed |
//!
//! A given configuration and dataset therefore always produce the same model.

use std::fmt;
use std::path::Path;

use monitor_core::config::ModelParams;
use monitor_core::error::{MonitorError, Result};
use monitor_core::forecast::{ForecastModel, ModelState};
use monitor_core::models::{Prediction, ProcessedDataset};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Name reported in logs and run reports.
pub const MODEL_NAME: &str = "random_forest";

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// On-disk form of a trained [`ForestForecaster`].
#[derive(Deserialize)]
struct SavedModel {
    model: String,
    params: ModelParams,
    training_loss: Option<f64>,
    forest: Forest,
}

/// Borrowed counterpart of [`SavedModel`] used when writing.
#[derive(Serialize)]
struct SavedModelRef<'a> {
    model: &'a str,
    params: &'a ModelParams,
    training_loss: Option<f64>,
    forest: &'a Forest,
}

// ── ForestForecaster ──────────────────────────────────────────────────────────

/// Random-forest revenue forecaster.
pub struct ForestForecaster {
    params: ModelParams,
    built: bool,
    forest: Option<Forest>,
    training_loss: Option<f64>,
}

impl fmt::Debug for ForestForecaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForestForecaster")
            .field("params", &self.params)
            .field("state", &self.state())
            .field("training_loss", &self.training_loss)
            .finish()
    }
}

impl ForestForecaster {
    /// Create an unbuilt model; nothing is fitted until `train`.
    pub fn new(params: ModelParams) -> Self {
        Self {
            params,
            built: false,
            forest: None,
            training_loss: None,
        }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Mean squared error on the training set after the last successful fit.
    pub fn training_loss(&self) -> Option<f64> {
        self.training_loss
    }

    /// Mean squared error of the fitted forest on `x` / `y`.
    ///
    /// `None` when the model is untrained, the inputs are empty, their
    /// lengths differ or the forest cannot score them.
    pub fn mse(&self, x: &[Vec<f64>], y: &[f64]) -> Option<f64> {
        let forest = self.forest.as_ref()?;
        if x.is_empty() || x.len() != y.len() {
            return None;
        }
        mean_squared_error(forest, x, y).ok()
    }

    /// Write the fitted forest as JSON, atomically.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let forest = match &self.forest {
            Some(forest) => forest,
            None => return Err(MonitorError::Precondition("model not trained".to_string())),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let saved = SavedModelRef {
            model: MODEL_NAME,
            params: &self.params,
            training_loss: self.training_loss,
            forest,
        };
        let json = serde_json::to_string(&saved)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        tracing::info!(path = %path.display(), "model saved");
        Ok(())
    }

    /// Load a model written by [`save_to`](Self::save_to); it is ready to predict.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let saved: SavedModel = serde_json::from_str(&content)?;

        if saved.model != MODEL_NAME {
            return Err(MonitorError::Configuration(format!(
                "{} holds a '{}' model, expected '{}'",
                path.display(),
                saved.model,
                MODEL_NAME
            )));
        }
        Self::validate_params(&saved.params)?;

        Ok(Self {
            params: saved.params,
            built: true,
            forest: Some(saved.forest),
            training_loss: saved.training_loss,
        })
    }

    fn validate_params(params: &ModelParams) -> Result<()> {
        for (key, value) in [
            ("units", params.units),
            ("timesteps", params.timesteps),
            ("epochs", params.epochs),
            ("batch_size", params.batch_size),
        ] {
            if value == 0 {
                return Err(MonitorError::Configuration(format!(
                    "model_params.{key} must be greater than zero"
                )));
            }
        }
        Ok(())
    }

    fn forest_parameters(params: &ModelParams) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters::default()
            .with_n_trees(params.epochs)
            .with_max_depth(u16::try_from(params.units).unwrap_or(u16::MAX))
            .with_min_samples_split(params.batch_size)
            .with_seed(params.seed)
    }

    /// Check the training tensors before touching any state.
    fn validate_training_data(&self, data: &ProcessedDataset) -> Result<()> {
        if data.x_train.is_empty() {
            return Err(MonitorError::Training(
                "no training windows (x_train is empty)".to_string(),
            ));
        }
        if data.x_train.len() != data.y_train.len() {
            return Err(MonitorError::Training(format!(
                "x_train has {} windows but y_train has {} targets",
                data.x_train.len(),
                data.y_train.len()
            )));
        }

        let timesteps = self.params.timesteps;
        if let Some((i, w)) = data
            .x_train
            .iter()
            .enumerate()
            .find(|(_, w)| w.len() != timesteps)
        {
            return Err(MonitorError::Training(format!(
                "shape mismatch: window {} has {} values, model expects {}",
                i,
                w.len(),
                timesteps
            )));
        }

        let finite = data.x_train.iter().flatten().all(|v| v.is_finite())
            && data.y_train.iter().all(|v| v.is_finite());
        if !finite {
            return Err(MonitorError::Training(
                "training data contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}

fn predict_windows(forest: &Forest, windows: &[Vec<f64>]) -> std::result::Result<Vec<f64>, String> {
    let matrix = DenseMatrix::from_2d_vec(&windows.to_vec()).map_err(|e| e.to_string())?;
    forest.predict(&matrix).map_err(|e| e.to_string())
}

fn mean_squared_error(
    forest: &Forest,
    x: &[Vec<f64>],
    y: &[f64],
) -> std::result::Result<f64, String> {
    let predicted = predict_windows(forest, x)?;
    let sum: f64 = predicted
        .iter()
        .zip(y)
        .map(|(p, t)| (p - t).powi(2))
        .sum();
    Ok(sum / y.len() as f64)
}

impl ForecastModel for ForestForecaster {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn state(&self) -> ModelState {
        match (self.built, &self.forest) {
            (_, Some(_)) => ModelState::Trained,
            (true, None) => ModelState::Built,
            (false, None) => ModelState::Unbuilt,
        }
    }

    fn build(&mut self, params: &ModelParams) -> Result<()> {
        Self::validate_params(params)?;

        self.params = params.clone();
        self.built = true;
        self.forest = None;
        self.training_loss = None;

        tracing::debug!(
            trees = params.epochs,
            max_depth = params.units,
            timesteps = params.timesteps,
            "forest model built"
        );
        Ok(())
    }

    fn train(&mut self, data: &ProcessedDataset) -> Result<()> {
        Self::validate_params(&self.params)?;
        self.validate_training_data(data)?;

        let x = DenseMatrix::from_2d_vec(&data.x_train)
            .map_err(|e| MonitorError::Training(format!("matrix error: {e}")))?;
        let forest = RandomForestRegressor::fit(
            &x,
            &data.y_train,
            Self::forest_parameters(&self.params),
        )
        .map_err(|e| MonitorError::Training(format!("forest fit failed: {e}")))?;

        let loss = mean_squared_error(&forest, &data.x_train, &data.y_train)
            .map_err(|e| MonitorError::Training(format!("scoring failed: {e}")))?;
        if !loss.is_finite() {
            return Err(MonitorError::Training(format!(
                "training loss is not finite ({loss})"
            )));
        }

        self.built = true;
        self.forest = Some(forest);
        self.training_loss = Some(loss);

        tracing::debug!(
            trees = self.params.epochs,
            windows = data.x_train.len(),
            loss,
            "forest model fitted"
        );
        Ok(())
    }

    fn predict(&self, data: &ProcessedDataset) -> Result<Prediction> {
        let forest = match &self.forest {
            Some(forest) => forest,
            None => return Err(MonitorError::Precondition("model not trained".to_string())),
        };

        let timesteps = self.params.timesteps;
        if let Some((i, w)) = data
            .x_test
            .iter()
            .enumerate()
            .find(|(_, w)| w.len() != timesteps)
        {
            return Err(MonitorError::Precondition(format!(
                "x_test window {} has {} values, model expects {}",
                i,
                w.len(),
                timesteps
            )));
        }

        if data.x_test.is_empty() {
            return Ok(Prediction::default());
        }

        let predicted = predict_windows(forest, &data.x_test)
            .map_err(|e| MonitorError::Precondition(format!("prediction failed: {e}")))?;
        Ok(Prediction::from_series(predicted))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn params(timesteps: usize) -> ModelParams {
        ModelParams {
            units: 8,
            timesteps,
            epochs: 30,
            batch_size: 2,
            seed: 7,
        }
    }

    /// Windows over a repeating ramp, normalized to `[0, 1]`.
    fn ramp_dataset(timesteps: usize) -> ProcessedDataset {
        let series: Vec<f64> = (0..40).map(|i| (i % 5) as f64 / 4.0).collect();
        let mut data = ProcessedDataset::default();
        for start in 0..series.len() - timesteps {
            data.x_train.push(series[start..start + timesteps].to_vec());
            data.y_train.push(series[start + timesteps]);
        }
        data.x_test.push(series[series.len() - timesteps..].to_vec());
        data
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn test_new_model_is_unbuilt() {
        let model = ForestForecaster::new(params(3));
        assert_eq!(model.state(), ModelState::Unbuilt);
        assert_eq!(model.name(), "random_forest");
    }

    #[test]
    fn test_build_then_train_then_predict() {
        let mut model = ForestForecaster::new(params(3));
        model.build(&params(3)).unwrap();
        assert_eq!(model.state(), ModelState::Built);

        let data = ramp_dataset(3);
        model.train(&data).unwrap();
        assert_eq!(model.state(), ModelState::Trained);

        let prediction = model.predict(&data).unwrap();
        assert_eq!(prediction.predicted_revenue.len(), 1);
        assert_eq!(prediction.revenue, prediction.predicted_revenue.last().copied());
    }

    #[test]
    fn test_train_builds_lazily() {
        let mut model = ForestForecaster::new(params(3));
        model.train(&ramp_dataset(3)).unwrap();
        assert_eq!(model.state(), ModelState::Trained);
    }

    #[test]
    fn test_rebuild_discards_fitted_forest() {
        let mut model = ForestForecaster::new(params(3));
        model.train(&ramp_dataset(3)).unwrap();
        model.build(&params(3)).unwrap();
        assert_eq!(model.state(), ModelState::Built);
        assert!(model.training_loss().is_none());
    }

    #[test]
    fn test_build_rejects_zero_units() {
        let mut model = ForestForecaster::new(params(3));
        let bad = ModelParams {
            units: 0,
            ..params(3)
        };
        let err = model.build(&bad).unwrap_err();
        assert!(matches!(err, MonitorError::Configuration(_)));
        assert_eq!(model.state(), ModelState::Unbuilt);
    }

    #[test]
    fn test_train_rejects_zero_trees() {
        let mut model = ForestForecaster::new(ModelParams {
            epochs: 0,
            ..params(3)
        });
        let err = model.train(&ramp_dataset(3)).unwrap_err();
        assert!(matches!(err, MonitorError::Configuration(ref m) if m.contains("epochs")));
        assert_eq!(model.state(), ModelState::Unbuilt);
    }

    // ── predict preconditions ─────────────────────────────────────────────

    #[test]
    fn test_predict_before_train_is_precondition_error() {
        let model = ForestForecaster::new(params(3));
        let err = model.predict(&ramp_dataset(3)).unwrap_err();
        assert!(matches!(err, MonitorError::Precondition(ref m) if m == "model not trained"));
    }

    #[test]
    fn test_predict_when_only_built_is_precondition_error() {
        let mut model = ForestForecaster::new(params(3));
        model.build(&params(3)).unwrap();
        let err = model.predict(&ramp_dataset(3)).unwrap_err();
        assert!(matches!(err, MonitorError::Precondition(_)));
    }

    #[test]
    fn test_predict_rejects_wrong_window_width() {
        let mut model = ForestForecaster::new(params(3));
        model.train(&ramp_dataset(3)).unwrap();
        let err = model.predict(&ramp_dataset(4)).unwrap_err();
        assert!(err.to_string().contains("model expects 3"));
    }

    #[test]
    fn test_predict_empty_x_test_has_no_revenue() {
        let mut model = ForestForecaster::new(params(3));
        let mut data = ramp_dataset(3);
        model.train(&data).unwrap();
        data.x_test.clear();
        let prediction = model.predict(&data).unwrap();
        assert!(prediction.revenue.is_none());
        assert!(prediction.predicted_revenue.is_empty());
    }

    // ── training failures leave state untouched ───────────────────────────

    #[test]
    fn test_empty_x_train_is_training_error_and_model_stays_untrained() {
        let mut model = ForestForecaster::new(params(3));
        let err = model.train(&ProcessedDataset::default()).unwrap_err();
        assert!(matches!(err, MonitorError::Training(_)));
        assert_eq!(model.state(), ModelState::Unbuilt);

        model.build(&params(3)).unwrap();
        assert!(model.train(&ProcessedDataset::default()).is_err());
        assert_eq!(model.state(), ModelState::Built);
    }

    #[test]
    fn test_shape_mismatch_is_training_error() {
        let mut model = ForestForecaster::new(params(3));
        let err = model.train(&ramp_dataset(4)).unwrap_err();
        assert!(err.to_string().contains("shape mismatch"));
        assert_eq!(model.state(), ModelState::Unbuilt);
    }

    #[test]
    fn test_target_count_mismatch_is_training_error() {
        let mut data = ramp_dataset(3);
        data.y_train.pop();
        let mut model = ForestForecaster::new(params(3));
        assert!(matches!(
            model.train(&data),
            Err(MonitorError::Training(_))
        ));
    }

    #[test]
    fn test_non_finite_input_is_training_error() {
        let mut data = ramp_dataset(3);
        data.y_train[0] = f64::NAN;
        let mut model = ForestForecaster::new(params(3));
        assert!(model.train(&data).is_err());
    }

    #[test]
    fn test_failed_retrain_keeps_previous_forest() {
        let mut model = ForestForecaster::new(params(3));
        let data = ramp_dataset(3);
        model.train(&data).unwrap();
        let before = model.predict(&data).unwrap();

        assert!(model.train(&ProcessedDataset::default()).is_err());
        assert_eq!(model.state(), ModelState::Trained);
        assert_eq!(model.predict(&data).unwrap(), before);
    }

    // ── fitting ───────────────────────────────────────────────────────────

    #[test]
    fn test_forest_learns_repeating_series() {
        let data = ramp_dataset(3);
        let mut model = ForestForecaster::new(params(3));
        model.train(&data).unwrap();

        let loss = model.training_loss().unwrap();
        assert!(loss < 0.05, "training loss too high: {loss}");
        assert_eq!(model.mse(&data.x_train, &data.y_train), Some(loss));

        // The newest window ends the ramp at 1.0; the next value restarts at 0.
        let forecast = model.predict(&data).unwrap().revenue.unwrap();
        assert!(forecast < 0.25, "forecast {forecast} should be near 0");
    }

    #[test]
    fn test_training_is_deterministic_for_a_seed() {
        let data = ramp_dataset(3);
        let mut a = ForestForecaster::new(params(3));
        let mut b = ForestForecaster::new(params(3));
        a.train(&data).unwrap();
        b.train(&data).unwrap();
        assert_eq!(a.predict(&data).unwrap(), b.predict(&data).unwrap());
    }

    // ── persistence ───────────────────────────────────────────────────────

    #[test]
    fn test_save_and_load_preserves_predictions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("models").join("forest.json");
        let data = ramp_dataset(3);

        let mut model = ForestForecaster::new(params(3));
        model.train(&data).unwrap();
        model.save_to(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = ForestForecaster::load_from(&path).unwrap();
        assert_eq!(loaded.state(), ModelState::Trained);
        assert_eq!(loaded.params(), model.params());
        assert_eq!(loaded.training_loss(), model.training_loss());
        assert_eq!(loaded.predict(&data).unwrap(), model.predict(&data).unwrap());
    }

    #[test]
    fn test_load_rejects_foreign_model_name() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("forest.json");
        let mut model = ForestForecaster::new(params(3));
        model.train(&ramp_dataset(3)).unwrap();
        model.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path)
            .unwrap()
            .replacen("\"random_forest\"", "\"lstm\"", 1);
        std::fs::write(&path, content).unwrap();

        let err = ForestForecaster::load_from(&path).unwrap_err();
        assert!(matches!(err, MonitorError::Configuration(ref m) if m.contains("'lstm'")));
    }

    #[test]
    fn test_save_untrained_is_precondition_error() {
        let tmp = TempDir::new().unwrap();
        let model = ForestForecaster::new(params(3));
        let err = model.save_to(&tmp.path().join("m.json")).unwrap_err();
        assert!(matches!(err, MonitorError::Precondition(_)));
    }
}
