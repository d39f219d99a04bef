//! Array-task worker: download one unit's inputs and hand them to the
//! external processor
//!
//! Each task resolves its own manifest line, works inside a scratch
//! workspace nothing else touches, and removes that workspace on every
//! exit path. Tasks share nothing but the read-only manifest, so one
//! task failing never disturbs the rest of the array.

/// Resolve the task's identity and work unit from the environment
pub mod context;

/// Bounded-parallel download stage
pub mod fetch;

/// Invoke the external transform-and-upload step
pub mod process;

/// Disposable per-task directory tree
pub mod workspace;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::config::load::Config;
use crate::manifest::record::ManifestError;

use context::TaskContext;
use fetch::Fetcher;
use process::{CommandProcessor, Processor};
use workspace::ScratchWorkspace;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("SLURM_ARRAY_TASK_ID is not set or not a number")]
    NoTaskId,
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("URL list {} is empty", .0.display())]
    EmptyUrlList(PathBuf),
    #[error("all {expected} downloads failed, nothing to process")]
    NothingFetched { expected: usize },
    #[error("processor exited with code {code}")]
    Processor { code: i32 },
    #[error("interrupted, cleaning up")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl WorkerError {
    /// Worker process exit code. The processor's own exit code passes
    /// through verbatim; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerError::Processor { code } => *code,
            _ => 1,
        }
    }
}

/// Run one array task to completion.
///
/// The scratch workspace is held by a drop guard for the whole run, so a
/// fatal stage error, SIGINT, or SIGTERM all leave nothing behind on the
/// node.
pub async fn run(config: &Config, manifest: &Path) -> Result<(), WorkerError> {
    let ctx = TaskContext::resolve(manifest)?;
    info!(
        "Task {} of array job {} owns unit {} of {}",
        ctx.task_index, ctx.array_job_id, ctx.unit.unit_id, ctx.unit.version
    );

    let workspace = ScratchWorkspace::create(&config.scratch_root, &ctx)?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(fetch::WgetFetcher);
    let processor = CommandProcessor { argv: config.processor.clone() };

    tokio::select! {
        result = stages(config, &ctx, &workspace, fetcher, &processor) => result,
        _ = wait_for_signal() => Err(WorkerError::Interrupted),
    }
}

/// The per-task pipeline: validate inputs, download, process.
async fn stages(
    config: &Config,
    ctx: &TaskContext,
    workspace: &ScratchWorkspace,
    fetcher: Arc<dyn Fetcher>,
    processor: &dyn Processor,
) -> Result<(), WorkerError> {
    let urls = read_url_list(&ctx.unit.url_list)?;
    if urls.is_empty() {
        return Err(WorkerError::EmptyUrlList(ctx.unit.url_list.clone()));
    }
    info!("Unit {} lists {} URLs", ctx.unit.unit_id, urls.len());

    let summary =
        fetch::download_all(fetcher, &urls, &workspace.raw_dir(), config.download_workers).await;
    if summary.succeeded == 0 {
        return Err(WorkerError::NothingFetched { expected: summary.expected });
    }
    if summary.succeeded < summary.expected {
        warn!(
            "Fetched {} of {} inputs, continuing with a partial batch",
            summary.succeeded, summary.expected
        );
    }

    let code = processor
        .run(&workspace.raw_dir(), &workspace.processed_dir(), &ctx.unit)
        .await?;
    if code != 0 {
        return Err(WorkerError::Processor { code });
    }

    info!("Unit {} processed", ctx.unit.unit_id);
    Ok(())
}

fn read_url_list(path: &Path) -> Result<Vec<String>, WorkerError> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(err) => {
            warn!("Can't listen for SIGTERM: {err}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
