#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the FRED series metadata harvest.
//!
//! Each `run` is one invocation of the harvest loop. It prints the result
//! as JSON on stdout and exits non-zero if the harvest failed. A paused
//! result carries the checkpoint to hand to the next invocation, either
//! as a file (`--checkpoint`) or by reading it back from storage
//! (`--resume`).
//!
//! Uses `indicatif-log-bridge` (via [`progress::init_logger`]) so log lines
//! and the progress spinner share the terminal.

mod progress;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use fred_metadata_filter::{ImportanceCriteria, ImportanceFilter};
use fred_metadata_harvest::budget::{Deadline, ExecutionBudget, Unbounded};
use fred_metadata_harvest::checkpoint::CheckpointManager;
use fred_metadata_harvest::config::{HarvestConfig, HarvestSettings, load_criteria};
use fred_metadata_harvest::index::IndexBuilder;
use fred_metadata_harvest::{HarvestContext, Harvester};
use fred_metadata_harvest_models::{Checkpoint, HarvestResult, HarvestStatus};
use fred_metadata_source::{FredClient, PageFetcher};
use fred_metadata_storage::{FsStore, ObjectStore, S3Store};
use indicatif::MultiProgress;

use crate::progress::SeriesBar;

#[derive(Parser)]
#[command(
    name = "fred_metadata",
    about = "Harvest important FRED series metadata into object storage"
)]
struct Cli {
    /// Store everything under this local directory instead of S3
    #[arg(long, global = true)]
    local_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one harvest invocation (or several, with `--until-complete`)
    Run(RunArgs),
    /// Print the latest stored checkpoint
    Status,
    /// Rebuild the series index from the stored batches
    Index,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Resume from the checkpoint in this JSON file
    #[arg(long, conflicts_with = "resume")]
    checkpoint: Option<PathBuf>,
    /// Resume from the latest checkpoint in storage, if there is one
    #[arg(long)]
    resume: bool,
    /// Keep invoking the harvest with each paused checkpoint until it
    /// completes or fails
    #[arg(long)]
    until_complete: bool,
    /// TOML file overriding the importance criteria
    #[arg(long)]
    criteria: Option<PathBuf>,
    /// Series requested per page (1-1000)
    #[arg(long)]
    page_limit: Option<u64>,
    /// Pause and checkpoint after this many seconds
    #[arg(long)]
    max_runtime_secs: Option<u64>,
    /// Behave as if the host kills each invocation after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,
    /// Seconds to sleep every few page fetches (0 disables)
    #[arg(long)]
    rate_limit_pause_secs: Option<u64>,
}

impl RunArgs {
    fn settings(&self) -> Result<HarvestSettings, Box<dyn std::error::Error>> {
        let mut settings = HarvestSettings::default();

        if let Some(limit) = self.page_limit {
            settings.page_limit = limit;
        }
        if let Some(secs) = self.max_runtime_secs {
            settings.max_runtime = Duration::from_secs(secs);
        }
        if let Some(secs) = self.rate_limit_pause_secs {
            settings.rate_limit_pause = Duration::from_secs(secs);
        }

        settings.validate()?;
        Ok(settings)
    }

    fn filter(&self) -> Result<ImportanceFilter, Box<dyn std::error::Error>> {
        let criteria = match &self.criteria {
            Some(path) => {
                log::info!("Loading importance criteria from {}", path.display());
                load_criteria(path)?
            }
            None => ImportanceCriteria::default(),
        };
        Ok(ImportanceFilter::new(criteria))
    }

    /// A fresh budget for one invocation.
    fn budget(&self) -> Arc<dyn ExecutionBudget> {
        match self.deadline_secs {
            Some(secs) => Arc::new(Deadline::after(Duration::from_secs(secs))),
            None => Arc::new(Unbounded),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let multi = progress::init_logger();
    let cli = Cli::parse();

    let config = HarvestConfig::from_env()?;
    let store = open_store(&config, cli.local_dir.as_deref()).await;
    let context = HarvestContext::new(store, &config.prefix);

    match cli.command {
        Commands::Run(args) => {
            let result = run(&args, &config, context, &multi).await?;
            log::info!("Harvest {}: {}", result.status, result.message);
            println!("{}", serde_json::to_string_pretty(&result)?);

            if result.status == HarvestStatus::Failed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Status => {
            match CheckpointManager::new(context).load().await? {
                Some(checkpoint) => println!("{}", serde_json::to_string_pretty(&checkpoint)?),
                None => log::info!("No checkpoint stored yet"),
            }
        }
        Commands::Index => {
            let batches = CheckpointManager::new(context.clone())
                .load()
                .await?
                .map_or(0, |checkpoint| checkpoint.batch_number);

            let index = IndexBuilder::new(context).build(batches).await?;
            println!("Indexed {} important series", index.count);
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn open_store(config: &HarvestConfig, local_dir: Option<&Path>) -> Arc<dyn ObjectStore> {
    match local_dir {
        Some(dir) => {
            log::info!("Using local store at {}", dir.display());
            Arc::new(FsStore::new(dir))
        }
        None => {
            log::info!("Using S3 bucket {}", config.bucket);
            Arc::new(S3Store::from_env(config.bucket.clone()).await)
        }
    }
}

async fn run(
    args: &RunArgs,
    config: &HarvestConfig,
    context: HarvestContext,
    multi: &MultiProgress,
) -> Result<HarvestResult, Box<dyn std::error::Error>> {
    let settings = args.settings()?;
    let filter = args.filter()?;
    let fetcher: Arc<dyn PageFetcher> = Arc::new(FredClient::new(config.api_key.clone()));
    let progress = SeriesBar::add_to(multi);

    let mut resume = starting_checkpoint(args, &context).await?;

    loop {
        let started_at = resume.as_ref().map_or(0, |checkpoint| checkpoint.offset);

        let result = Harvester::new(context.clone(), fetcher.clone())
            .with_filter(filter.clone())
            .with_settings(settings)
            .with_budget(args.budget())
            .with_progress(progress.clone())
            .run(resume.take())
            .await;

        if !(args.until_complete && result.should_resume()) {
            return Ok(result);
        }

        if result.checkpoint.offset == started_at {
            log::warn!("Invocation paused without progress at offset {started_at}; stopping");
            return Ok(result);
        }

        log::info!(
            "Invocation paused at offset {}; starting the next one",
            result.checkpoint.offset
        );
        resume = Some(result.checkpoint);
    }
}

async fn starting_checkpoint(
    args: &RunArgs,
    context: &HarvestContext,
) -> Result<Option<Checkpoint>, Box<dyn std::error::Error>> {
    if let Some(path) = &args.checkpoint {
        let text = tokio::fs::read_to_string(path).await?;
        return Ok(Some(serde_json::from_str(&text)?));
    }

    if args.resume {
        let checkpoint = CheckpointManager::new(context.clone()).load().await?;
        if checkpoint.is_none() {
            log::info!("No stored checkpoint found. Starting from the beginning.");
        }
        return Ok(checkpoint);
    }

    Ok(None)
}
