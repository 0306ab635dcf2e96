use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};

use bulk_loader::{
    BatchError,
    core::{job::JobExecution, step::DEFAULT_CHUNK_SIZE},
    credentials::{Credentials, DEFAULT_CREDENTIALS_PATH},
    loader::{LoggerDestination, MongodbDestination, run_manifest},
    manifest::Manifest,
};

#[derive(Parser, Debug)]
#[command(name = "bulk-loader", version, about = "Seeds the document database from local JSON files")]
struct Cli {
    /// Key file of the destination database
    #[arg(long, default_value = DEFAULT_CREDENTIALS_PATH)]
    credentials: PathBuf,

    /// Directory holding the source files
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// TOML file replacing the built-in upload table
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Records per atomic batch
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Plain inserts instead of one transaction per batch (standalone servers)
    #[arg(long)]
    no_transactions: bool,

    /// Read and clean everything, log instead of writing
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("FATAL ERROR: {error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Everything a run needs, settled before the first upload.
struct Plan {
    /// `None` on dry runs.
    credentials: Option<Credentials>,
    manifest: Manifest,
    chunk_size: usize,
    transactional: bool,
}

/// Checks the key file first, then loads the manifest and settles the options.
fn prepare(cli: &Cli) -> Result<Plan> {
    let credentials = if cli.dry_run {
        None
    } else {
        Some(load_credentials(&cli.credentials)?)
    };

    let manifest = match &cli.manifest {
        Some(path) => Manifest::from_path(path)
            .with_context(|| format!("invalid manifest '{}'", path.display()))?,
        None => Manifest::default(),
    }
    .resolve(&cli.data_dir);

    let chunk_size = cli
        .chunk_size
        .or(manifest.chunk_size)
        .unwrap_or(DEFAULT_CHUNK_SIZE);
    let transactional = !cli.no_transactions && manifest.transactional.unwrap_or(true);

    Ok(Plan {
        credentials,
        manifest,
        chunk_size,
        transactional,
    })
}

fn run(cli: Cli) -> Result<()> {
    let plan = prepare(&cli)?;

    info!("--- STARTING BULK LOAD ---");

    let execution = match &plan.credentials {
        Some(credentials) => {
            let destination = MongodbDestination::connect(credentials, plan.transactional)
                .context("cannot create database client")?;
            run_manifest(&plan.manifest, &destination, plan.chunk_size)?
        }
        None => {
            warn!("Dry run: nothing will be written");
            run_manifest(&plan.manifest, &LoggerDestination, plan.chunk_size)?
        }
    };

    report(&execution);
    info!("--- PROCESS FINISHED ---");
    Ok(())
}

fn load_credentials(path: &Path) -> Result<Credentials> {
    match Credentials::load(path) {
        Err(BatchError::MissingFile(path)) => {
            anyhow::bail!("key file '{}' not found", path.display())
        }
        result => Ok(result?),
    }
}

fn report(execution: &JobExecution) {
    for step in &execution.step_executions {
        info!(
            "{:<45} {:<14} written: {:>6}  dropped: {:>4}",
            step.name,
            format!("{:?}", step.status),
            step.write_count,
            step.filter_count
        );
    }

    let failed = execution.failed_steps().count();
    if failed > 0 {
        warn!("{} step(s) failed, see errors above", failed);
    }
    info!(
        "{} documents written in {:.1?}",
        execution.write_count(),
        execution.duration
    );
}
