//! CSV and JSONL record loading for configured data sources.
//!
//! Turns the files behind a [`SourceDescriptor`] into flat [`RawRecord`]s.
//! A source path may point at a single file or at a directory, in which case
//! every file with the source's extension beneath it is read in path order.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use monitor_core::config::{SourceDescriptor, SourceKind};
use monitor_core::error::{MonitorError, Result};
use monitor_core::models::RawRecord;
use serde_json::Value;
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all files with `extension` recursively under `dir`, sorted by path.
pub fn find_source_files(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Source path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == extension)
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load every record behind `source`.
///
/// Fails with [`MonitorError::SourceUnavailable`] when the path is missing,
/// a file cannot be opened, or a directory holds no matching files, and with
/// [`MonitorError::MalformedRecord`] when a row or line cannot be parsed.
pub fn load_source_records(source: &SourceDescriptor) -> Result<Vec<RawRecord>> {
    let files = resolve_files(source)?;

    let mut records = Vec::new();
    for file in &files {
        let before = records.len();
        match source.kind {
            SourceKind::Csv => read_csv_file(&source.name, file, &mut records)?,
            SourceKind::Jsonl => read_jsonl_file(&source.name, file, &mut records)?,
        }
        debug!(
            "Source {}: {} records from {}",
            source.name,
            records.len() - before,
            file.display()
        );
    }

    Ok(records)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn resolve_files(source: &SourceDescriptor) -> Result<Vec<PathBuf>> {
    let path = &source.path;
    if !path.exists() {
        return Err(unavailable(
            &source.name,
            format!("path {} does not exist", path.display()),
        ));
    }

    if path.is_file() {
        return Ok(vec![path.clone()]);
    }

    let files = find_source_files(path, source.kind.extension());
    if files.is_empty() {
        return Err(unavailable(
            &source.name,
            format!(
                "no .{} files found in {}",
                source.kind.extension(),
                path.display()
            ),
        ));
    }
    Ok(files)
}

/// Append the rows of a headed CSV file to `out`. Empty cells become `null`.
fn read_csv_file(source_name: &str, path: &Path, out: &mut Vec<RawRecord>) -> Result<()> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        unavailable(source_name, format!("failed to open {}: {}", path.display(), e))
    })?;

    let headers = reader
        .headers()
        .map_err(|e| malformed(source_name, out.len(), format!("bad CSV header: {e}")))?
        .clone();

    for row in reader.records() {
        let index = out.len();
        let row = row.map_err(|e| {
            if e.is_io_error() {
                unavailable(source_name, format!("failed to read {}: {}", path.display(), e))
            } else {
                malformed(source_name, index, e.to_string())
            }
        })?;

        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(key, cell)| {
                let value = if cell.trim().is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (key.to_string(), value)
            })
            .collect();
        out.push(record);
    }

    Ok(())
}

/// Append the objects of a JSONL file to `out`. Blank lines are skipped.
fn read_jsonl_file(source_name: &str, path: &Path, out: &mut Vec<RawRecord>) -> Result<()> {
    let file = std::fs::File::open(path).map_err(|e| {
        unavailable(source_name, format!("failed to open {}: {}", path.display(), e))
    })?;

    let reader = std::io::BufReader::new(file);
    for (line_no, line_result) in reader.lines().enumerate() {
        // `lines()` reports non-UTF-8 content as `InvalidData`.
        let line = line_result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                malformed(
                    source_name,
                    out.len(),
                    format!("line {} of {}: {}", line_no + 1, path.display(), e),
                )
            } else {
                unavailable(source_name, format!("failed to read {}: {}", path.display(), e))
            }
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let index = out.len();
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => out.push(map),
            Ok(_) => {
                return Err(malformed(
                    source_name,
                    index,
                    format!("line {} of {} is not a JSON object", line_no + 1, path.display()),
                ))
            }
            Err(e) => {
                return Err(malformed(
                    source_name,
                    index,
                    format!("line {} of {}: {}", line_no + 1, path.display(), e),
                ))
            }
        }
    }

    Ok(())
}

fn unavailable(source_name: &str, reason: String) -> MonitorError {
    MonitorError::SourceUnavailable {
        source_name: source_name.to_string(),
        reason,
    }
}

fn malformed(source_name: &str, index: usize, reason: String) -> MonitorError {
    MonitorError::MalformedRecord {
        source_name: source_name.to_string(),
        index,
        reason,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
