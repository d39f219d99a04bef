use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// One row of the batch manifest: a single unit of download-and-process work.
///
/// No whitespace escaping is supported within fields, so the builder refuses
/// to write any field containing whitespace rather than producing a line the
/// worker would misparse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// Path to the pre-split URL-list file for this unit
    pub url_list: PathBuf,
    /// Dataset version tag, e.g. v1.5
    pub version: String,
    /// 1-based position within the version, zero padded (0001, 0002, ...)
    pub unit_id: String,
    /// Destination repository id for the processed output
    pub destination: String,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest line {line} has {found} fields, expected 4")]
    Malformed { line: usize, found: usize },
    #[error("no manifest line for task index {index}")]
    MissingLine { index: u32 },
    #[error("can't read manifest {}: {source}", path.display())]
    Unreadable { path: PathBuf, source: io::Error },
}

impl WorkUnit {
    /// Parse one manifest line; `line` is the 1-indexed line number, used
    /// only for error reporting.
    pub fn parse(text: &str, line: usize) -> Result<Self, ManifestError> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(ManifestError::Malformed { line, found: fields.len() });
        }
        Ok(WorkUnit {
            url_list: PathBuf::from(fields[0]),
            version: fields[1].to_string(),
            unit_id: fields[2].to_string(),
            destination: fields[3].to_string(),
        })
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.url_list.display(),
            self.version,
            self.unit_id,
            self.destination
        )
    }
}
