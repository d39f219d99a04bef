use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use tinytemplate::TinyTemplate;

use crate::config::schema;

/// Immutable pipeline configuration, loaded once and passed by reference
/// into every subcommand.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Dataset name, used for the job name and destination rendering
    pub dataset: String,
    /// Version tags to plan, in processing order
    pub versions: Vec<String>,
    /// Directory containing one subdirectory of URL-list files per version
    pub urls_root: PathBuf,
    /// Where the batch manifest is written by plan and read by submit
    pub manifest_path: PathBuf,
    /// Root for per-task scratch workspaces (node-local or shared scratch)
    pub scratch_root: PathBuf,
    /// Holds the rendered job script, task logs, and the submission ledger
    pub submit_dir: PathBuf,
    /// Bounded parallelism for the download stage within one task
    pub download_workers: usize,
    /// Array throttle (%N); 0 leaves the array unbounded
    #[serde(default)]
    pub max_concurrent_tasks: u32,
    /// Destination repository template, rendered with {dataset} and {version}
    pub destination_template: String,
    /// Argv prefix for the external processor, e.g. ["python", "process_batch_duckdb.py"]
    pub processor: Vec<String>,
    pub sbatch: SbatchConfig,
}

/// Resource values passed through to the #SBATCH header verbatim
#[derive(Debug, Deserialize)]
pub struct SbatchConfig {
    pub partition: String,
    pub account: String,
    pub time: String,
    pub memory: String,
}

#[derive(Serialize)]
struct DestinationContext<'a> {
    dataset: &'a str,
    version: &'a str,
}

pub fn load(path: &Path) -> Result<Config> {
    info!("Reading configuration from {}", path.display());
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Can't read configuration at {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Configuration at {} is not valid JSON", path.display()))?;
    schema::validate(&json)?;
    let config: Config = serde_json::from_value(json).context("Deserialising configuration")?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Reject unusable values before any work begins
    fn validate(&self) -> Result<()> {
        if self.dataset.trim().is_empty() {
            bail!("dataset name is empty");
        }
        if self.versions.is_empty() {
            bail!("no versions configured, nothing to plan");
        }
        if self.download_workers == 0 {
            bail!("download_workers must be at least 1");
        }
        if self.processor.is_empty() {
            bail!("processor command is empty");
        }
        Ok(())
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.urls_root.join(version)
    }

    /// Render the destination repository id for one version
    pub fn destination(&self, version: &str) -> Result<String> {
        let mut tt = TinyTemplate::new();
        // repository ids carry dots and slashes, leave them untouched
        tt.set_default_formatter(&tinytemplate::format_unescaped);
        tt.add_template("destination", &self.destination_template)
            .context("Bad destination template")?;
        let context = DestinationContext { dataset: &self.dataset, version };
        tt.render("destination", &context).context("Rendering destination")
    }
}
