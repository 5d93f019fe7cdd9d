//! `stagesync plan` — show the pending operation sets without applying.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use stagesync_engine::{JobOutcome, Reconciler};

use super::{load_config_and_client, load_snapshot};

/// Arguments for `stagesync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Configuration YAML (default: ~/.stagesync/config.yaml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Tracking-system snapshot JSON (default: ~/.stagesync/snapshot.json).
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "job")]
    job: String,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "action")]
    action: &'static str,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let (config, client) = load_config_and_client(self.config)?;
        let snapshot = load_snapshot(self.snapshot)?;

        let result = Reconciler::new(&client, &config).run(&snapshot, true);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("failed to serialize plan")?
            );
            return Ok(());
        }

        let rows: Vec<PlanRow> = result
            .details
            .iter()
            .map(|detail| PlanRow {
                job: detail.job_name.clone(),
                kind: detail.kind.to_string(),
                action: match detail.outcome {
                    JobOutcome::Created => "create",
                    JobOutcome::Updated => "update",
                    JobOutcome::Deleted => "delete",
                    JobOutcome::Unchanged => "none",
                    JobOutcome::Failed => "failed",
                },
            })
            .collect();

        if rows.is_empty() && result.errors.is_empty() {
            println!("Nothing to reconcile: no expected jobs and no managed console jobs.");
            return Ok(());
        }

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!(
            "{} create, {} update, {} delete, {} unchanged",
            result.shot_jobs_created + result.assets_jobs_created,
            result.shot_jobs_updated + result.assets_jobs_updated,
            result.shot_jobs_deleted + result.assets_jobs_deleted,
            result
                .details
                .iter()
                .filter(|d| d.outcome == JobOutcome::Unchanged)
                .count(),
        );

        if !result.errors.is_empty() {
            println!("{}", format!("{} error(s):", result.errors.len()).red().bold());
            for error in &result.errors {
                println!("  {}", error.red());
            }
        }

        Ok(())
    }
}
