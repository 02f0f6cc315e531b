//! Data layer for the monetization monitor.
//!
//! Provides the collection and processing collaborators: reading CSV and
//! JSONL revenue sources into a raw dataset, and turning that dataset into
//! normalized sliding windows for the forecast model.

pub mod collector;
pub mod processor;
pub mod reader;

pub use collector::{DataCollector, FileCollector};
pub use monitor_core as core;
pub use processor::{DataProcessor, WindowProcessor};
