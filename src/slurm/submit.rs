use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use log::info;

use crate::config::load::Config;
use crate::db;
use crate::manifest;
use crate::slurm::array_job::{self, JobPath};

/// Submit the manifest as one SLURM array job.
///
/// Reports the scheduler's answer and returns without waiting for the
/// array to finish; task outcomes land in the per-task logs.
pub fn submit(config: &Config, config_path: &Path, dry_run: bool) -> Result<()> {
    let count = manifest::read::count_units(&config.manifest_path)?;
    if count == 0 {
        bail!(
            "manifest {} is empty, refusing to submit",
            config.manifest_path.display()
        );
    }
    info!("Submitting array job for {count} units");

    let job = array_job::create(config, config_path, count)?;

    if dry_run {
        info!("--dry-run set, not running sbatch");
        return Ok(());
    }

    let slurm_id = run_sbatch(&job)?;
    info!("SLURM job id: {slurm_id}");

    let conn = db::open::open_ledger(&config.submit_dir)?;
    db::ledger::mark_submitted(&conn, &slurm_id)?;
    Ok(())
}

fn run_sbatch(job: &JobPath) -> Result<String> {
    let job_script_path = job
        .path
        .to_str()
        .context("Job script path is not valid UTF-8")?;
    let arguments = vec!["--parsable", job_script_path];

    let mut sbatch = Command::new("sbatch");
    let cmd = sbatch.args(&arguments);
    info!("Running sbatch process");
    info!("{:?}", &cmd);
    let output = cmd.output().context("failed to execute sbatch")?;

    if !output.status.success() {
        bail!(
            "sbatch exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
