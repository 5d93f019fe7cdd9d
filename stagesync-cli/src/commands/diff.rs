//! `stagesync diff` — unified diff of expected versus existing job bodies.
//!
//! Read-only: renders what `sync` would send for each expected job and
//! compares it against the console's current body for the same name.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{Map, Value};
use similar::TextDiff;

use stagesync_client::types::READ_ONLY_FIELDS;
use stagesync_client::{JobSpec, RemoteJob};
use stagesync_engine::{builder, inventory, AgentResolver};

use super::{load_config_and_client, load_snapshot};

/// Arguments for `stagesync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Configuration YAML (default: ~/.stagesync/config.yaml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Tracking-system snapshot JSON (default: ~/.stagesync/snapshot.json).
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let (config, client) = load_config_and_client(self.config)?;
        let snapshot = load_snapshot(self.snapshot)?;

        let mut resolver = AgentResolver::new(&client);
        let primary_id = resolver
            .resolve("primary storage", &config.primary_storage)
            .context("primary storage agent could not be resolved")?;
        let desired = builder::build(&snapshot, &config, primary_id, &mut resolver);
        let existing =
            inventory::fetch_managed(&client).context("failed to list managed jobs")?;

        let mut differences = 0usize;
        for (name, job) in &desired.jobs {
            let expected = pretty(&serde_json::to_value(JobSpec::from(job))?)?;
            let current = match existing.get(name) {
                Some(remote) => pretty(&writable_body(remote)?)?,
                None => String::new(),
            };
            if expected == current {
                continue;
            }
            differences += 1;

            let old_header = format!("console/{name}");
            let new_header = format!("expected/{name}");
            let unified = TextDiff::from_lines(&current, &expected)
                .unified_diff()
                .header(&old_header, &new_header)
                .context_radius(3)
                .to_string();
            println!("{unified}");
        }

        for name in existing.keys() {
            if desired.jobs.contains_key(name) || desired.failed.contains(name) {
                continue;
            }
            differences += 1;
            println!("{}", format!("only on console (sync would delete): {name}").red());
        }

        for error in &desired.errors {
            println!("{}", error.red());
        }

        if differences == 0 {
            println!("No differences: console matches the expected job set.");
        }
        Ok(())
    }
}

/// The writable portion of a fetched job body, shaped like a create payload.
fn writable_body(job: &RemoteJob) -> Result<Value> {
    let mut body = Map::new();
    body.insert("name".to_owned(), Value::String(job.name.clone()));
    for (key, value) in &job.rest {
        if READ_ONLY_FIELDS.contains(&key.as_str()) {
            continue;
        }
        body.insert(key.clone(), value.clone());
    }
    body.insert(
        "agents".to_owned(),
        serde_json::to_value(&job.agents).context("failed to encode agents")?,
    );
    Ok(Value::Object(body))
}

fn pretty(value: &Value) -> Result<String> {
    let mut rendered =
        serde_json::to_string_pretty(value).context("failed to render job body")?;
    rendered.push('\n');
    Ok(rendered)
}
