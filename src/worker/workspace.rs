use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::worker::context::TaskContext;

/// Task-exclusive disposable directory tree for raw and processed data.
///
/// The directory name carries the array job id, task index, and unit id,
/// so concurrent tasks never collide even when unit ids repeat across
/// versions. Dropping the guard removes the whole tree, which is the
/// worker's cleanup guarantee on every exit path.
pub struct ScratchWorkspace {
    root: PathBuf,
}

impl ScratchWorkspace {
    pub fn create(scratch_root: &Path, ctx: &TaskContext) -> io::Result<Self> {
        let root = scratch_root.join(&ctx.unit.version).join(format!(
            "{}_{}_{}",
            ctx.array_job_id, ctx.task_index, ctx.unit.unit_id
        ));
        info!("Preparing scratch workspace {}", root.display());
        fs::create_dir_all(root.join("raw"))?;
        fs::create_dir_all(root.join("processed"))?;
        Ok(ScratchWorkspace { root })
    }

    /// Download target for the unit's inputs
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    /// Output directory handed to the processor
    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        info!("Removing scratch workspace {}", self.root.display());
        if let Err(err) = fs::remove_dir_all(&self.root) {
            warn!("Can't remove workspace {}: {err}", self.root.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::record::WorkUnit;

    fn ctx(job_id: &str, index: u32, version: &str, unit_id: &str) -> TaskContext {
        TaskContext {
            array_job_id: job_id.to_string(),
            task_index: index,
            unit: WorkUnit {
                url_list: PathBuf::from("urls/batch.txt"),
                version: version.to_string(),
                unit_id: unit_id.to_string(),
                destination: "repo".to_string(),
            },
        }
    }

    #[test]
    fn creates_raw_and_processed_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = ScratchWorkspace::create(dir.path(), &ctx("1", 0, "v1", "0001")).unwrap();
        assert!(workspace.raw_dir().is_dir());
        assert!(workspace.processed_dir().is_dir());
    }

    #[test]
    fn drop_removes_the_whole_tree() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = ScratchWorkspace::create(dir.path(), &ctx("1", 0, "v1", "0001")).unwrap();
        let root = workspace.raw_dir().parent().unwrap().to_path_buf();
        fs::write(workspace.raw_dir().join("input.json.gz"), b"data").unwrap();

        drop(workspace);
        assert!(!root.exists());
    }

    #[test]
    fn same_unit_id_in_different_versions_does_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let a = ScratchWorkspace::create(dir.path(), &ctx("9", 0, "v1", "0001")).unwrap();
        let b = ScratchWorkspace::create(dir.path(), &ctx("9", 2, "v2", "0001")).unwrap();
        assert_ne!(a.raw_dir(), b.raw_dir());
    }
}
