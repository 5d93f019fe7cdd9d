//! `stagesync daemon` — background reconciliation lifecycle.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use stagesync_daemon::paths::socket_path;
use stagesync_daemon::{request_status, request_stop, start_blocking, DaemonError, DaemonSettings};

use super::{config_path, snapshot_path};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground (watcher + queue + socket server).
    Start(DaemonStartArgs),
    /// Request graceful daemon shutdown over the Unix socket.
    Stop,
    /// Query daemon runtime status over the Unix socket.
    Status,
}

#[derive(Args, Debug)]
pub struct DaemonStartArgs {
    /// Configuration YAML (default: ~/.stagesync/config.yaml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Tracking-system snapshot JSON (default: ~/.stagesync/snapshot.json).
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;

    match command {
        DaemonCommand::Start(args) => {
            let settings = DaemonSettings {
                home: home.clone(),
                config_path: config_path(args.config)?,
                snapshot_path: snapshot_path(args.snapshot)?,
            };
            start_blocking(settings).context("daemon exited with error")?;
        }
        DaemonCommand::Stop => match request_stop(&home) {
            Ok(()) => println!("daemon stop requested"),
            Err(DaemonError::DaemonNotRunning { .. }) => {
                println!("daemon is not running");
            }
            Err(err) => return Err(err).context("failed to stop daemon"),
        },
        DaemonCommand::Status => match request_status(&home) {
            Ok(status) => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&status)
                        .context("failed to render daemon status JSON")?
                );
            }
            Err(DaemonError::DaemonNotRunning { .. }) => {
                let payload = serde_json::json!({
                    "running": false,
                    "socket": socket_path(&home).display().to_string(),
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&payload)
                        .context("failed to render daemon status JSON")?
                );
            }
            Err(err) => return Err(err).context("failed to query daemon status"),
        },
    }

    Ok(())
}
