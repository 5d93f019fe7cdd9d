//! `stagesync sync` — one reconciliation pass against the console.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use stagesync_engine::{JobOutcome, ReconcileResult, Reconciler};

use super::{load_config_and_client, load_snapshot};

/// Arguments for `stagesync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Configuration YAML (default: ~/.stagesync/config.yaml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Tracking-system snapshot JSON (default: ~/.stagesync/snapshot.json).
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Compute and show the plan without issuing any mutating call.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the raw reconciliation result as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let (config, client) = load_config_and_client(self.config)?;
        let snapshot = load_snapshot(self.snapshot)?;

        let result = Reconciler::new(&client, &config).run(&snapshot, self.dry_run);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("failed to serialize result")?
            );
            return Ok(());
        }

        print_result(&result);
        Ok(())
    }
}

fn print_result(result: &ReconcileResult) {
    let prefix = if result.dry_run { "[dry-run] " } else { "" };

    if result.total_changes() == 0 && result.errors.is_empty() {
        println!(
            "{prefix}✓ in sync — nothing to do ({} jobs checked, {} ms)",
            result.details.len(),
            result.duration_ms,
        );
        return;
    }

    println!(
        "{prefix}✓ reconciled in {} ms ({} created, {} updated, {} deleted)",
        result.duration_ms,
        result.shot_jobs_created + result.assets_jobs_created,
        result.shot_jobs_updated + result.assets_jobs_updated,
        result.shot_jobs_deleted + result.assets_jobs_deleted,
    );

    for detail in &result.details {
        let line = match detail.outcome {
            JobOutcome::Created => format!("  ✚  {}", detail.job_name).green().to_string(),
            JobOutcome::Updated => format!("  ↻  {}", detail.job_name).yellow().to_string(),
            JobOutcome::Deleted => format!("  ✖  {}", detail.job_name).red().to_string(),
            JobOutcome::Unchanged => format!("  ·  {}", detail.job_name),
            JobOutcome::Failed => format!("  !  {}", detail.job_name).red().bold().to_string(),
        };
        let hydrated = if detail.hydrated { " (hydrated)" } else { "" };
        println!("{line}{hydrated}");
    }

    println!("{} artists processed", result.artists_processed);

    if !result.errors.is_empty() {
        println!("{}", format!("{} error(s):", result.errors.len()).red().bold());
        for error in &result.errors {
            println!("  {}", error.red());
        }
    }
}
