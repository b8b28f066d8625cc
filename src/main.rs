//! Command-line host for the update client.
//!
//! Drives one package's license and update checks against a JSON-file
//! store and prints the outcome as JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use license_updater::updater::storage::{FileStore, KeyValueStore};
use license_updater::{HostAvailability, PackageIdentity, PackageUpdater, UpdaterConfig};

/// Check a licensed package for updates and manage its update key
#[derive(Parser, Debug)]
#[command(name = "license-updater", about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Vendor endpoint, overrides UPDATER_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Settings namespace of the package
    #[arg(long)]
    id: String,

    /// Host-relative package identifier, e.g. my-plugin/my-plugin.php
    #[arg(long)]
    name: String,

    /// Name the vendor knows the package by
    #[arg(long)]
    display_name: String,

    /// Installed version
    #[arg(long = "version")]
    installed: String,

    /// Use the pre-release channel
    #[arg(long)]
    beta: bool,

    /// JSON store location (default: user data dir)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the stored key and license status
    Status,
    /// Compare the installed version with the vendor's latest
    Check,
    /// Print full package details
    Info,
    /// Store a key and activate it with the vendor
    Activate { key: String },
    /// Store a key and deactivate it with the vendor
    Deactivate { key: String },
    /// Re-validate a valid license
    Ping,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let mut config = UpdaterConfig::from_env().context("loading configuration")?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url)?;
    }

    let store_path = match cli.store {
        Some(path) => path,
        None => FileStore::default_path()?,
    };
    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&store_path)
            .with_context(|| format!("opening store {}", store_path.display()))?,
    );
    tracing::debug!(store = %store_path.display(), "store opened");

    let package = PackageIdentity::new(cli.id, cli.name, cli.display_name, cli.installed.clone())
        .with_beta(cli.beta);
    let updater = PackageUpdater::new(package, config, store, Arc::new(HostAvailability::new()))?;

    let output = match cli.command {
        Commands::Status => json!({
            "update_key": updater.license().update_key()?,
            "status": updater.license().status()?,
        }),
        Commands::Check => json!(updater.checker().check_for_update(&cli.installed).await),
        Commands::Info => json!(updater.checker().version_info().await),
        Commands::Activate { key } => json!({ "status": updater.license().activate(&key).await? }),
        Commands::Deactivate { key } => {
            json!({ "status": updater.license().deactivate(&key).await? })
        }
        Commands::Ping => json!({ "status": updater.license().check().await? }),
    };

    Ok(serde_json::to_string_pretty(&output)?)
}
