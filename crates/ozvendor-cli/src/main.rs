//! OZ Vendor CLI - Syncs a vendored copy of the OpenZeppelin contracts.
//!
//! Reports are printed as JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ozvendor_core::{CancellationToken, Resolution, StaticPolicy, SyncConfig, SyncController};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "ozvendor")]
#[command(about = "Vendor the OpenZeppelin contract library into a project")]
struct Args {
    /// Directory the library is vendored into
    #[arg(long)]
    library_dir: Option<PathBuf>,

    /// Base URL of the remote distribution
    #[arg(long)]
    source_url: Option<String>,

    /// Library version to pin (defaults to the latest one)
    #[arg(long = "version", value_name = "VERSION")]
    pin: Option<String>,

    /// Category to install; repeat for several (defaults to all)
    #[arg(short, long = "category", value_name = "NAME")]
    categories: Vec<String>,

    /// Number of files fetched at the same time
    #[arg(long)]
    concurrency: Option<usize>,

    /// JSON settings file providing defaults for the options above
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bring the library in line with the manifest
    Sync {
        /// What to do with files that were changed locally
        #[arg(long, value_enum, default_value_t = OnInvalid::Skip)]
        on_invalid: OnInvalid,

        /// Move the library to a newer version when one is offered
        #[arg(long)]
        upgrade: bool,
    },
    /// Classify local files without changing anything
    Status,
    /// List the categories of the manifest
    Categories,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OnInvalid {
    Skip,
    Replace,
    Abort,
}

impl From<OnInvalid> for Resolution {
    fn from(value: OnInvalid) -> Self {
        match value {
            OnInvalid::Skip => Resolution::Skip,
            OnInvalid::Replace => Resolution::Replace,
            OnInvalid::Abort => Resolution::Abort,
        }
    }
}

impl Args {
    /// Settings file values, overridden by whatever was given on the command
    /// line.
    fn sync_config(&self) -> Result<SyncConfig> {
        let mut config = match &self.settings {
            Some(path) => SyncConfig::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => SyncConfig::default(),
        };

        if let Some(dir) = &self.library_dir {
            config.library_dir = dir.clone();
        }
        if let Some(url) = &self.source_url {
            config.source_url = url.clone();
        }
        if self.pin.is_some() {
            config.version = self.pin.clone();
        }
        if !self.categories.is_empty() {
            config.categories = self.categories.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        Ok(config)
    }
}

fn policy(on_invalid: OnInvalid, upgrade: bool) -> StaticPolicy {
    StaticPolicy {
        on_invalid: on_invalid.into(),
        on_out_of_date: if upgrade {
            Resolution::Replace
        } else {
            Resolution::Skip
        },
        upgrade,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Stdout carries the JSON report
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = args.sync_config()?;
    info!("Library directory: {}", config.library_dir.display());
    let controller = SyncController::from_config(config)?;

    match args.command {
        Command::Sync {
            on_invalid,
            upgrade,
        } => {
            let cancel = CancellationToken::new();
            let handle = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling sync");
                    handle.cancel();
                }
            });

            let report = controller
                .sync(&policy(on_invalid, upgrade), &cancel)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            if report.is_complete() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Status => {
            let status = controller.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Categories => {
            let categories = controller.categories().await?;
            println!("{}", serde_json::to_string_pretty(&categories)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
