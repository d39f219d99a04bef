use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::config::load::Config;

/// A JobPath is the path to an array job script that's submitted to SLURM
/// via sbatch
pub struct JobPath {
    pub path: PathBuf,
}

/// All rendered sections of the array job script
struct JobTemplate {
    header: Header,
    workflow: Workflow,
}

impl JobTemplate {
    /// Write the complete job script to disk by appending rendered sections
    fn write(self, out_path: &Path) -> Result<(), io::Error> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(out_path)?;

        // order is important when writing the file
        let contents = [self.header.content, self.workflow.content];

        for content in contents.iter() {
            file.write_all(content.as_bytes())?;
        }

        Ok(())
    }
}

/// Rendered SBATCH header
///
/// The array directive carries the whole dispatch contract: index range
/// [0, L-1] over the manifest's L lines, plus an optional %N throttle.
/// Partition, account, time, and memory are configuration values passed
/// through verbatim.
struct Header {
    content: String,
}

/// Rendered workflow command: every task runs the same worker invocation
/// and picks its own manifest line by array index.
struct Workflow {
    content: String,
}

/// Rendering context for the header
#[derive(Serialize)]
struct HeaderContext {
    name: String,
    array_range: String,
    partition: String,
    account: String,
    time: String,
    memory: String,
    log_dir: String,
    time_now: String,
}

/// Rendering context for the workflow
#[derive(Serialize)]
struct WorkflowContext {
    harava: String,
    config_path: String,
    manifest_path: String,
}

/// Render the array job script for a manifest of `unit_count` lines
pub fn create(config: &Config, config_path: &Path, unit_count: usize) -> Result<JobPath> {
    let log_dir = config.submit_dir.join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Can't create log directory {}", log_dir.display()))?;

    let header = render_header(config, unit_count, &log_dir)?;
    let workflow = render_workflow(config, config_path)?;
    let job = JobTemplate { header, workflow };

    let path = config.submit_dir.join("array_job.sh");
    job.write(&path)
        .with_context(|| format!("Can't write job script to {}", path.display()))?;
    info!("Wrote array job script to {}", path.display());

    Ok(JobPath { path })
}

/// The --array directive value: 0 to L-1, with a %N throttle when the
/// concurrency cap is set (0 = unbounded, no suffix).
pub fn array_range(unit_count: usize, cap: u32) -> String {
    let range = format!("0-{}", unit_count - 1);
    match cap {
        0 => range,
        cap => format!("{range}%{cap}"),
    }
}

/// Render the SBATCH header using TinyTemplate
fn render_header(config: &Config, unit_count: usize, log_dir: &Path) -> Result<Header> {
    /// included header template
    static HEADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/header.txt"));
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("header", HEADER).expect("Template");

    let context = HeaderContext {
        name: format!("harava-{}", config.dataset),
        array_range: array_range(unit_count, config.max_concurrent_tasks),
        partition: config.sbatch.partition.clone(),
        account: config.sbatch.account.clone(),
        time: config.sbatch.time.clone(),
        memory: config.sbatch.memory.clone(),
        log_dir: log_dir.display().to_string(),
        time_now: Utc::now().to_string(),
    };

    Ok(Header { content: tt.render("header", &context).context("Rendered header")? })
}

/// Render the worker invocation using TinyTemplate
fn render_workflow(config: &Config, config_path: &Path) -> Result<Workflow> {
    /// included workflow template
    static WORKER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/worker.txt"));
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("worker", WORKER).expect("Template");

    // tasks start in their own working directory with their own PATH, so
    // pin the binary and both file paths
    let context = WorkflowContext {
        harava: worker_binary().display().to_string(),
        config_path: absolute(config_path).display().to_string(),
        manifest_path: absolute(&config.manifest_path).display().to_string(),
    };

    Ok(Workflow { content: tt.render("worker", &context).context("Rendered workflow")? })
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// The submitting binary is the worker binary; compute nodes share the
/// filesystem but not necessarily the submitter's PATH.
fn worker_binary() -> PathBuf {
    std::env::current_exe().unwrap_or_else(|_| PathBuf::from("harava"))
}
