use galah_bot::config::BotConfig;
use galah_bot::orchestrator::{Orchestrator, StarTarget};

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Post a GALAH star with a sky image and a proper name
#[derive(Debug, Parser)]
#[command(name = "galah-bot", version, about)]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Post this star instead of a random one
    #[arg(long, conflicts_with = "dr3_source_id")]
    sobject_id: Option<i64>,

    /// Post the star with this Gaia DR3 source id
    #[arg(long)]
    dr3_source_id: Option<i64>,

    /// Do everything except publishing
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn target(&self) -> StarTarget {
        match (self.sobject_id, self.dr3_source_id) {
            (Some(id), _) => StarTarget::SobjectId(id),
            (None, Some(id)) => StarTarget::Dr3SourceId(id),
            (None, None) => StarTarget::Random,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // A missing config file means defaults
    let config = if args.config.exists() {
        BotConfig::from_file(&args.config)?
    } else {
        BotConfig::default()
    };

    let _logging_guard = galah_bot::logging::init_logging(&config.log_dir, "galah-bot", &config.log_level)?;

    tracing::info!("GALAH bot starting...");
    if !args.config.exists() {
        tracing::warn!("Config file {} not found, using defaults", args.config.display());
    }
    if args.dry_run {
        tracing::info!("Dry run: nothing will be published");
    }

    let orchestrator = Orchestrator::from_config(config)?;
    match orchestrator.run(args.target(), args.dry_run).await {
        Ok(outcome) => {
            tracing::info!(
                "Done: {} imaged with {}{}",
                outcome.name,
                outcome.survey,
                outcome
                    .published
                    .map(|p| format!(", published to {}", p))
                    .unwrap_or_default()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {:#}", e);
            Err(e)
        }
    }
}
