//! Pipeline configuration.
//!
//! The on-disk document is TOML. It is deserialized into a loose
//! [`ConfigFile`] and then validated once into an immutable
//! [`PipelineConfig`] with every default applied, so downstream code never
//! looks up keys or falls back to defaults itself.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Revenue threshold used when the document does not set one.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Fraction of windows held out for evaluation by default.
pub const DEFAULT_TEST_RATIO: f64 = 0.2;

pub const DEFAULT_SEED: u64 = 42;

// ── On-disk shape ─────────────────────────────────────────────────────────────

/// Configuration document as written by the operator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub data_sources: Vec<SourceDescriptor>,
    #[serde(default)]
    pub model_params: ModelParamsFile,
    pub threshold: Option<f64>,
    pub test_ratio: Option<f64>,
}

/// Model parameters as written; every key is optional until validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelParamsFile {
    pub units: Option<usize>,
    pub timesteps: Option<usize>,
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub seed: Option<u64>,
}

/// File format of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Csv,
    Jsonl,
}

impl SourceKind {
    /// File extension matched when the source path is a directory.
    pub fn extension(&self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Jsonl => "jsonl",
        }
    }
}

/// A single configured data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDescriptor {
    /// Unique source name, used as the key of the collected dataset.
    pub name: String,
    pub kind: SourceKind,
    /// File, or directory scanned recursively for files of `kind`.
    pub path: PathBuf,
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
    #[serde(default = "default_value_field")]
    pub value_field: String,
}

fn default_timestamp_field() -> String {
    "timestamp".to_string()
}

fn default_value_field() -> String {
    "revenue".to_string()
}

// ── Validated configuration ───────────────────────────────────────────────────

/// Validated forecast-model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Model capacity (maximum tree depth for the bundled forest).
    pub units: usize,
    /// Window length fed to the model.
    pub timesteps: usize,
    /// Fitting rounds (trees in the bundled forest).
    pub epochs: usize,
    /// Minimum windows per split.
    pub batch_size: usize,
    /// Seed for bootstrap and feature sampling.
    pub seed: u64,
}

impl TryFrom<ModelParamsFile> for ModelParams {
    type Error = MonitorError;

    fn try_from(file: ModelParamsFile) -> Result<Self> {
        let units = require_positive("units", file.units)?;
        let timesteps = require_positive("timesteps", file.timesteps)?;
        let epochs = require_positive("epochs", file.epochs)?;
        let batch_size = require_positive("batch_size", file.batch_size)?;

        Ok(Self {
            units,
            timesteps,
            epochs,
            batch_size,
            seed: file.seed.unwrap_or(DEFAULT_SEED),
        })
    }
}

fn require_positive(key: &str, value: Option<usize>) -> Result<usize> {
    match value {
        None => Err(MonitorError::Configuration(format!(
            "model_params.{key} is required"
        ))),
        Some(0) => Err(MonitorError::Configuration(format!(
            "model_params.{key} must be greater than zero"
        ))),
        Some(v) => Ok(v),
    }
}

/// Immutable, validated configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub data_sources: Vec<SourceDescriptor>,
    pub model_params: ModelParams,
    /// Normalized revenue above which pricing is increased.
    pub threshold: f64,
    /// Fraction of windows held out for evaluation.
    pub test_ratio: f64,
}

impl PipelineConfig {
    /// Load and validate a TOML configuration file.
    ///
    /// Relative source paths are resolved against the directory containing
    /// the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| MonitorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;

        if let Some(base) = path.parent() {
            for source in &mut config.data_sources {
                if source.path.is_relative() {
                    source.path = base.join(&source.path);
                }
            }
        }

        tracing::debug!(
            path = %path.display(),
            sources = config.data_sources.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse and validate a TOML configuration string.
    ///
    /// Malformed TOML is a [`MonitorError::TomlParse`]; well-formed TOML with
    /// unknown or wrongly typed keys is a [`MonitorError::Configuration`].
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let table: toml::Table = s.parse()?;
        let file: ConfigFile = toml::Value::Table(table)
            .try_into()
            .map_err(|e| MonitorError::Configuration(format!("invalid configuration: {e}")))?;
        Self::try_from(file)
    }

    /// Return a copy with `threshold` replaced, validating the new value.
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        self.threshold = threshold;
        Ok(self)
    }
}

impl TryFrom<ConfigFile> for PipelineConfig {
    type Error = MonitorError;

    fn try_from(file: ConfigFile) -> Result<Self> {
        if file.data_sources.is_empty() {
            return Err(MonitorError::Configuration(
                "at least one entry in data_sources is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &file.data_sources {
            if source.name.trim().is_empty() {
                return Err(MonitorError::Configuration(
                    "data source name must not be empty".to_string(),
                ));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(MonitorError::Configuration(format!(
                    "duplicate data source name '{}'",
                    source.name
                )));
            }
        }

        let threshold = file.threshold.unwrap_or(DEFAULT_THRESHOLD);
        validate_threshold(threshold)?;

        let test_ratio = file.test_ratio.unwrap_or(DEFAULT_TEST_RATIO);
        if !(0.0..1.0).contains(&test_ratio) {
            return Err(MonitorError::Configuration(format!(
                "test_ratio must be in [0, 1), got {test_ratio}"
            )));
        }

        Ok(Self {
            data_sources: file.data_sources,
            model_params: ModelParams::try_from(file.model_params)?,
            threshold,
            test_ratio,
        })
    }
}

fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() {
        Ok(())
    } else {
        Err(MonitorError::Configuration(format!(
            "threshold must be a finite number, got {threshold}"
        )))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
