//! stagesync — keep console file-distribution jobs aligned with
//! production-tracking assignments.
//!
//! # Usage
//!
//! ```text
//! stagesync sync [--config <yaml>] [--snapshot <json>] [--dry-run] [--json]
//! stagesync plan [--config <yaml>] [--snapshot <json>] [--json]
//! stagesync diff [--config <yaml>] [--snapshot <json>]
//! stagesync hydrate --job <name> [--agent <id>]... <path>...
//! stagesync daemon start|stop|status
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    daemon::DaemonCommand, diff::DiffArgs, hydrate::HydrateArgs, plan::PlanArgs, sync::SyncArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "stagesync",
    version,
    about = "Reconcile console distribution jobs with tracking-system assignments",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one reconciliation pass and apply the plan.
    Sync(SyncArgs),

    /// Compute the plan without applying anything.
    Plan(PlanArgs),

    /// Show per-job diffs between expected and existing job bodies.
    Diff(DiffArgs),

    /// Hydrate file paths on a managed job's active run.
    Hydrate(HydrateArgs),

    /// Manage the background reconciliation daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Hydrate(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}
