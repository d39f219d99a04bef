use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::{error, info};

mod config;
mod db;
mod manifest;
mod slurm;
mod worker;

#[derive(Parser)]
#[command(name = "harava", about = "Plan, submit, and run batched dataset-download jobs on SLURM")]
struct Cli {
    /// Path to the pipeline configuration file
    #[arg(long, default_value = "harava.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the URL-list directories and write the batch manifest
    Plan,
    /// Submit the manifest as a SLURM array job
    Submit {
        /// Render the job script but don't run sbatch or touch the ledger
        #[arg(long)]
        dry_run: bool,
    },
    /// Run as one array task (normally invoked by the batch script)
    Worker {
        /// Manifest written by plan; the task picks its line by array index
        manifest: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    info!("terve! starting up :)");

    let cli = Cli::parse();

    let config = match config::load::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            error!("{err:#}");
            process::exit(1);
        }
    };

    match cli.command {
        Command::Plan => {
            if let Err(err) = plan(&config) {
                error!("{err:#}");
                process::exit(1);
            }
        }
        Command::Submit { dry_run } => {
            if let Err(err) = slurm::submit::submit(&config, &cli.config, dry_run) {
                error!("{err:#}");
                process::exit(1);
            }
        }
        Command::Worker { manifest } => {
            if let Err(err) = worker::run(&config, &manifest).await {
                error!("worker failed: {err}");
                process::exit(err.exit_code());
            }
        }
    }
}

fn plan(config: &config::load::Config) -> anyhow::Result<()> {
    let units = manifest::build::plan(config)?;
    let conn = db::open::open_ledger(&config.submit_dir)?;
    db::ledger::record_planned(&conn, &units)?;
    Ok(())
}
