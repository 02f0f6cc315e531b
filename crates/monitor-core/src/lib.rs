//! Core types for the monetization monitor.
//!
//! Holds the error taxonomy, the validated pipeline configuration, CLI
//! settings, the dataset and prediction model, field parsing helpers, the
//! [`ForecastModel`](forecast::ForecastModel) contract and the strategy rule.

pub mod config;
pub mod data_processors;
pub mod error;
pub mod forecast;
pub mod models;
pub mod settings;
pub mod strategy;

pub use error::{MonitorError, PipelineError, Result, Stage};
