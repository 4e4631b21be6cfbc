//! Read a benchmark log fully into memory.

use std::fs;
use std::path::{Path, PathBuf};

/// The input log could not be read.
#[derive(Debug)]
pub struct InputReadError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl std::fmt::Display for InputReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to read log file {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for InputReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Load every line of a log file.
///
/// # Parameters
///
/// * `path` - Path to the log file
///
/// # Returns
///
/// The lines without their terminators. Empty lines are kept so that indices
/// match the file.
pub fn load_lines(path: &Path) -> Result<Vec<String>, InputReadError> {
    let content = fs::read_to_string(path).map_err(|source| InputReadError {
        path: path.to_path_buf(),
        source,
    })?;

    let lines: Vec<String> = content.lines().map(str::to_string).collect();
    log::info!("Read {} lines from {}", lines.len(), path.display());

    Ok(lines)
}
