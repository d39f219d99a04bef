use std::env;
use std::path::Path;
use std::process;

use log::info;

use crate::manifest::read;
use crate::manifest::record::WorkUnit;
use crate::worker::WorkerError;

/// Everything one array task knows about itself.
///
/// The scheduler assigns the task index through the environment; the
/// worker never chooses its own.
#[derive(Debug)]
pub struct TaskContext {
    pub array_job_id: String,
    pub task_index: u32,
    pub unit: WorkUnit,
}

impl TaskContext {
    pub fn resolve(manifest: &Path) -> Result<Self, WorkerError> {
        let task_index = env::var("SLURM_ARRAY_TASK_ID")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .ok_or(WorkerError::NoTaskId)?;

        // outside SLURM (manual reruns) the pid keeps workspace paths unique
        let array_job_id =
            env::var("SLURM_ARRAY_JOB_ID").unwrap_or_else(|_| process::id().to_string());

        let unit = read::resolve(manifest, task_index)?;
        info!("Resolved manifest line {} for task {task_index}", task_index + 1);

        Ok(TaskContext { array_job_id, task_index, unit })
    }
}
