//! Remote job inventory — the one read against live console state.
//!
//! Fetched fresh for every reconciliation call, never cached across calls.

use std::collections::BTreeMap;

use stagesync_client::{Console, RemoteJob};
use stagesync_core::types::JobName;

use crate::error::EngineError;

/// Fetch all console jobs and keep those owned by the reconciliation
/// engine (name carries the managed prefix), keyed by exact name.
pub fn fetch_managed(console: &dyn Console) -> Result<BTreeMap<JobName, RemoteJob>, EngineError> {
    let mut managed = BTreeMap::new();
    for job in console.jobs()? {
        if !JobName::is_managed(&job.name) {
            continue;
        }
        managed.insert(JobName(job.name.clone()), job);
    }
    tracing::debug!("console holds {} managed jobs", managed.len());
    Ok(managed)
}
