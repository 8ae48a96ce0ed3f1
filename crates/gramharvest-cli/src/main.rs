mod harvest;
mod output;

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gramharvest_core::{HarvestConfig, TargetKind};
use tracing_subscriber::EnvFilter;

use crate::harvest::HarvestArgs;

#[derive(Debug, Parser)]
#[command(name = "gramharvest")]
#[command(about = "Harvest posts and comments from profiles, hashtags, locations and more")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Harvest one or more targets of the same kind into CSV files
    Harvest(HarvestArgs),
    /// List the target kinds and whether each needs a login
    Targets,
}

/// `RUST_LOG` wins over the configured level. With a log file configured,
/// events are appended there without ANSI colors; otherwise they go to
/// stderr so stdout stays clean for summaries.
fn init_tracing(config: &HarvestConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn print_targets() {
    for kind in TargetKind::ALL {
        let access = if kind.requires_login() {
            "login required"
        } else {
            "anonymous"
        };
        println!("{:<16} {access}", kind.as_str());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Targets => {
            print_targets();
            Ok(())
        }
        Commands::Harvest(args) => {
            let config = gramharvest_core::load_config_from_env()
                .context("failed to load configuration")?;
            init_tracing(&config)?;
            harvest::run_harvest(&config, &args).await
        }
    }
}
