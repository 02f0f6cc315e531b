//! Collection stage: configured sources in, [`RawDataset`] out.

use monitor_core::config::SourceDescriptor;
use monitor_core::error::Result;
use monitor_core::models::{RawDataset, SourceBatch};
use tracing::info;

use crate::reader::load_source_records;

/// Fetches raw records from configured sources.
pub trait DataCollector {
    /// Collect every source into one dataset.
    ///
    /// A failure in any source aborts the whole fetch; no partial dataset is
    /// ever returned.
    fn fetch(&self, sources: &[SourceDescriptor]) -> Result<RawDataset>;
}

// ── FileCollector ─────────────────────────────────────────────────────────────

/// Reads CSV and JSONL sources from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCollector;

impl FileCollector {
    pub fn new() -> Self {
        Self
    }
}

impl DataCollector for FileCollector {
    fn fetch(&self, sources: &[SourceDescriptor]) -> Result<RawDataset> {
        let mut dataset = RawDataset::default();

        for source in sources {
            let records = load_source_records(source)?;
            info!(
                source = %source.name,
                records = records.len(),
                "source collected"
            );
            dataset.sources.insert(
                source.name.clone(),
                SourceBatch {
                    timestamp_field: source.timestamp_field.clone(),
                    value_field: source.value_field.clone(),
                    records,
                },
            );
        }

        Ok(dataset)
    }
}
