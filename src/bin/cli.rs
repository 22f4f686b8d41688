//! Collector CLI
//!
//! Harvests the community directory into the summary cache and renders
//! the map feed and community table from it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use collector::{
    error::Result,
    models::Config,
    pipeline::{self, RenderTargets},
    storage::SummaryStore,
    utils::http,
};

/// Collector - community directory harvester
#[derive(Parser, Debug)]
#[command(name = "collector", version, about = "Community directory harvester")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch all communities and update the summary cache
    Harvest {
        #[command(flatten)]
        outputs: Outputs,
    },

    /// Render outputs from the existing summary cache
    Render {
        #[command(flatten)]
        outputs: Outputs,
    },

    /// Validate the configuration file
    Validate,

    /// Show summary cache info
    Info,
}

#[derive(Args, Debug)]
struct Outputs {
    /// Write the GeoJSON feed
    #[arg(short, long)]
    geojson: bool,

    /// Write the HTML community table
    #[arg(short, long)]
    table: bool,
}

impl From<&Outputs> for RenderTargets {
    fn from(outputs: &Outputs) -> Self {
        Self {
            geojson: outputs.geojson,
            table: outputs.table,
        }
    }
}

/// Initialize logging from the verbosity flag or the configured level.
fn init_logging(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let loaded = Config::load(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &level);

    let config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Harvest { outputs } => {
            config.validate()?;
            let client = http::create_client(&config.harvest)?;

            let report = pipeline::run_harvest(&config, &client).await?;
            log::info!(
                "Harvested {} communities: {} fetched, {} failed, {} additional locations, {} removed",
                report.communities,
                report.fetched,
                report.failed,
                report.synthetic,
                report.removed
            );

            pipeline::run_render(&config, RenderTargets::from(&outputs)).await?;
        }

        Command::Render { outputs } => {
            let targets = RenderTargets::from(&outputs);
            if !targets.any() {
                log::warn!("Nothing to render, pass --geojson and/or --table");
            }
            pipeline::run_render(&config, targets).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("✓ Config OK");
        }

        Command::Info => {
            let store = SummaryStore::from_config(&config.paths);
            log::info!("Directory: {}", config.directory.url);
            log::info!("Summary cache: {}", store.path().display());
            log::info!("History: {}", config.paths.history_dir().display());

            let summary = store.load().await?;
            let fresh = summary.values().filter(|r| r.is_fresh()).count();
            let stale = summary.values().filter(|r| r.is_stale()).count();
            log::info!(
                "{} records: {} fresh, {} stale",
                summary.len(),
                fresh,
                stale
            );
        }
    }

    Ok(())
}
