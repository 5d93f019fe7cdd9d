//! Subcommand implementations plus shared input loading.

pub mod daemon;
pub mod diff;
pub mod hydrate;
pub mod plan;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};

use stagesync_client::ConsoleClient;
use stagesync_core::{config::Config, snapshot, Snapshot};
use stagesync_daemon::paths::{default_config_path, default_snapshot_path};

pub(crate) fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => {
            let home = dirs::home_dir().context("could not determine home directory")?;
            Ok(default_config_path(&home))
        }
    }
}

pub(crate) fn snapshot_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => {
            let home = dirs::home_dir().context("could not determine home directory")?;
            Ok(default_snapshot_path(&home))
        }
    }
}

/// Configuration plus a connected console client.
pub(crate) fn load_config_and_client(explicit: Option<PathBuf>) -> Result<(Config, ConsoleClient)> {
    let path = config_path(explicit)?;
    let config = Config::load(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    let token = config.console.token().context("console token missing")?;
    let client = ConsoleClient::new(&config.console.url, &token);
    Ok((config, client))
}

pub(crate) fn load_snapshot(explicit: Option<PathBuf>) -> Result<Snapshot> {
    let path = snapshot_path(explicit)?;
    snapshot::load(&path)
        .with_context(|| format!("failed to load snapshot from {}", path.display()))
}
