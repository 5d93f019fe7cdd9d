//! `stagesync hydrate` — request immediate materialization of file paths on
//! a managed job's run.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use stagesync_client::Console;
use stagesync_engine::ensure_run;

use super::load_config_and_client;

/// Arguments for `stagesync hydrate`.
#[derive(Args, Debug)]
pub struct HydrateArgs {
    /// Configuration YAML (default: ~/.stagesync/config.yaml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Managed job name, e.g. HybridWork_TST_TST_010_0010.
    #[arg(long)]
    pub job: String,

    /// Restrict hydration to these agent ids (default: the job's endusers).
    #[arg(long = "agent")]
    pub agents: Vec<u64>,

    /// File paths to hydrate (console rejects more than 1000 per request).
    #[arg(required = true)]
    pub files: Vec<String>,
}

impl HydrateArgs {
    pub fn run(self) -> Result<()> {
        let (_config, client) = load_config_and_client(self.config)?;

        let jobs = client.jobs().context("failed to list console jobs")?;
        let Some(job) = jobs.iter().find(|j| j.name == self.job) else {
            bail!("no console job named '{}'", self.job);
        };

        let run_id = ensure_run(&client, job.id)
            .with_context(|| format!("failed to start a run for '{}'", self.job))?;

        let agents: Vec<u64> = if self.agents.is_empty() {
            job.enduser_ids().into_iter().collect()
        } else {
            self.agents.clone()
        };

        let report = client
            .hydrate(run_id, &self.files, Some(&agents))
            .with_context(|| format!("hydrate failed for '{}'", self.job))?;

        println!(
            "hydrate request for {} path(s) sent to {}/{} agent(s) on run {run_id}",
            self.files.len(),
            report.sent_count(),
            agents.len(),
        );
        Ok(())
    }
}
