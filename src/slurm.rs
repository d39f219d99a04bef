//! Render the array job script and submit it with sbatch

/// Render the batch script from embedded templates
pub mod array_job;

/// Run sbatch and record the submission
pub mod submit;
