use std::fs;
use std::path::Path;

use crate::manifest::record::{ManifestError, WorkUnit};

/// Number of work units in the manifest, which is exactly the array size
/// the dispatcher must request.
pub fn count_units(path: &Path) -> Result<usize, ManifestError> {
    Ok(read(path)?.lines().count())
}

/// Resolve the work unit owned by one array task: 0-indexed task i owns
/// the 1-indexed line i + 1. A missing or blank line means the manifest
/// and the submitted array disagree, which is fatal for this task.
pub fn resolve(path: &Path, index: u32) -> Result<WorkUnit, ManifestError> {
    let text = read(path)?;
    let line = text
        .lines()
        .nth(index as usize)
        .filter(|line| !line.trim().is_empty())
        .ok_or(ManifestError::MissingLine { index })?;
    WorkUnit::parse(line, index as usize + 1)
}

fn read(path: &Path) -> Result<String, ManifestError> {
    fs::read_to_string(path).map_err(|source| ManifestError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}
