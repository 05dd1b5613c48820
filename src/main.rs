use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use gator::commands::{self, Command, State};
use gator::config::{default_config_path, Config};
use gator::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(name = "gator", version, about = "Command-line RSS aggregator")]
struct Args {
    /// Config file (default: ~/.config/gator/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Restrict the config directory to the current user.
#[cfg(unix)]
fn restrict_permissions(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(dir) {
        Ok(metadata) => {
            let mut perms = metadata.permissions();
            perms.set_mode(0o700);
            if let Err(e) = std::fs::set_permissions(dir, perms) {
                tracing::warn!(
                    path = %dir.display(),
                    error = %e,
                    "Failed to set config directory permissions to 0700"
                );
            }
        }
        Err(e) => {
            tracing::warn!(
                path = %dir.display(),
                error = %e,
                "Failed to read config directory metadata"
            );
        }
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_dir: &Path) {}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gator=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let (config_path, default_location) = match args.config {
        Some(path) => (path, false),
        None => (default_config_path()?, true),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if default_location {
        if let Some(dir) = config_path.parent() {
            restrict_permissions(dir);
        }
    }

    if let Some(dir) = config.db_path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).context("Failed to create database directory")?;
        }
    }
    let db_path = config
        .db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: The database is locked by another gator process. Try again later.");
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let mut state = State::new(db, config, config_path);
    commands::run(&mut state, args.command).await
}
