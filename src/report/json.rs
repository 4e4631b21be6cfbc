//! JSON serialization of extracted results.

use anyhow::Context;
use std::fs;
use std::path::Path;

use crate::analyzer::RdmaResults;

/// Error type for report reading and writing failures.
#[derive(Debug)]
pub enum ReportError {
    FileWriteError(String),
    FileReadError(String),
    SerializeError(String),
    ParseError(String),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::FileWriteError(msg) => write!(f, "Failed to write report: {}", msg),
            ReportError::FileReadError(msg) => write!(f, "Failed to read report: {}", msg),
            ReportError::SerializeError(msg) => write!(f, "Failed to serialize results: {}", msg),
            ReportError::ParseError(msg) => write!(f, "Failed to parse JSON: {}", msg),
        }
    }
}

impl std::error::Error for ReportError {}

/// Render results as pretty-printed JSON.
///
/// Top-level keys are `bandwidth` then `latency`; record keys keep their
/// declaration order.
pub fn to_json(results: &RdmaResults) -> Result<String, ReportError> {
    serde_json::to_string_pretty(results).map_err(|e| ReportError::SerializeError(e.to_string()))
}

/// Write results to `path`, creating parent directories as needed.
pub fn write_json(results: &RdmaResults, path: &Path) -> Result<(), ReportError> {
    let json = to_json(results)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))
            .map_err(|e| ReportError::FileWriteError(format!("{:#}", e)))?;
    }

    fs::write(path, json)
        .with_context(|| format!("Failed to write file: {}", path.display()))
        .map_err(|e| ReportError::FileWriteError(format!("{:#}", e)))?;

    log::info!(
        "Wrote {} bandwidth and {} latency records to {}",
        results.bandwidth.len(),
        results.latency.len(),
        path.display()
    );
    Ok(())
}

/// Load a report previously written by [`write_json`].
pub fn read_json(path: &Path) -> Result<RdmaResults, ReportError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
        .map_err(|e| ReportError::FileReadError(format!("{:#}", e)))?;

    serde_json::from_str(&data)
        .context("Invalid JSON format")
        .map_err(|e| ReportError::ParseError(format!("{:#}", e)))
}
