use std::io;
use std::path::Path;

use async_trait::async_trait;
use log::{info, warn};
use tokio::process::Command;

use crate::manifest::record::WorkUnit;

/// Capability seam for the external transform-and-upload step, so the
/// worker pipeline can run against a fake in tests.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Returns the processor's exit code; failing to spawn is an io error.
    async fn run(&self, input_dir: &Path, output_dir: &Path, unit: &WorkUnit) -> io::Result<i32>;
}

/// Spawns the configured argv, normally the DuckDB batch script
pub struct CommandProcessor {
    pub argv: Vec<String>,
}

#[async_trait]
impl Processor for CommandProcessor {
    async fn run(&self, input_dir: &Path, output_dir: &Path, unit: &WorkUnit) -> io::Result<i32> {
        let program = self.argv.first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "processor command is empty")
        })?;

        let mut cmd = Command::new(program);
        cmd.args(&self.argv[1..])
            .arg("--batch_data_dir")
            .arg(input_dir)
            .arg("--output_dir")
            .arg(output_dir)
            .arg("--batch_num_str")
            .arg(&unit.unit_id)
            .arg("--dataset_version")
            .arg(&unit.version)
            .arg("--hf_repo_id")
            .arg(&unit.destination)
            .kill_on_drop(true);

        info!("Running processor for unit {}", unit.unit_id);
        info!("{:?}", &cmd);
        let status = cmd.status().await?;

        match status.code() {
            Some(code) => Ok(code),
            None => {
                warn!("Processor was killed by a signal");
                Ok(1)
            }
        }
    }
}
