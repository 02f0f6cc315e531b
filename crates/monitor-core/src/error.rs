use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the monetization monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A data source could not be read during collection.
    #[error("Source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// A collected record violates the expected schema.
    #[error("Malformed record {index} in source '{source_name}': {reason}")]
    MalformedRecord {
        source_name: String,
        index: usize,
        reason: String,
    },

    /// Too few observations to build a single training window.
    #[error("Insufficient data: need at least {required} observations, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// The forecast model failed to fit the training data.
    #[error("Training error: {0}")]
    Training(String),

    /// An operation was invoked before its prerequisites were met.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A required field is absent from a prediction.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A TOML document could not be parsed.
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the monitor crates.
pub type Result<T> = std::result::Result<T, MonitorError>;

// ── Stage ─────────────────────────────────────────────────────────────────────

/// One step of the linear pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Collect,
    Process,
    Train,
    Predict,
    Decide,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Collect,
        Stage::Process,
        Stage::Train,
        Stage::Predict,
        Stage::Decide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Collect => "collect",
            Stage::Process => "process",
            Stage::Train => "train",
            Stage::Predict => "predict",
            Stage::Decide => "decide",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── PipelineError ─────────────────────────────────────────────────────────────

/// A [`MonitorError`] tagged with the pipeline stage that produced it.
#[derive(Error, Debug)]
#[error("stage '{stage}' failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: MonitorError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: MonitorError) -> Self {
        Self { stage, source }
    }
}
