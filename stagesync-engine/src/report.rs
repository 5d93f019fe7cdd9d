//! Result model for one reconciliation run.
//!
//! Working state stays in ordered collections inside the reconciler; this
//! module is the flattened boundary shape handed back to the invoking
//! collaborator (CLI, daemon, webhook handler) for logging or response
//! bodies.

use serde::{Deserialize, Serialize};

use stagesync_core::types::{JobKind, JobName, ManagedJob};

/// Terminal state of one job name in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobOutcome {
    Created,
    Updated,
    Deleted,
    /// Enduser agent sets already match; no call was issued.
    Unchanged,
    Failed,
}

/// One per-job record in [`ReconcileResult::details`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetail {
    pub job_name: String,
    pub kind: JobKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub outcome: JobOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub hydrated: bool,
}

impl JobDetail {
    pub(crate) fn for_job(job: &ManagedJob, outcome: JobOutcome) -> Self {
        Self {
            job_name: job.name.0.clone(),
            kind: job.kind,
            project: Some(job.project.clone()),
            shot: job.shot.clone(),
            path: Some(job.primary_path.clone()),
            outcome,
            error: None,
            hydrated: false,
        }
    }

    /// Detail for a job only known by name (deletions of console jobs that
    /// no longer have a desired-state counterpart).
    pub(crate) fn for_name(name: &JobName, outcome: JobOutcome) -> Self {
        Self {
            job_name: name.0.clone(),
            kind: name.kind(),
            project: None,
            shot: None,
            path: None,
            outcome,
            error: None,
            hydrated: false,
        }
    }

    pub(crate) fn with_error(mut self, message: &str) -> Self {
        self.outcome = JobOutcome::Failed;
        self.error = Some(message.to_owned());
        self
    }
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileResult {
    #[serde(default)]
    pub dry_run: bool,
    pub shot_jobs_created: usize,
    pub shot_jobs_updated: usize,
    pub shot_jobs_deleted: usize,
    pub assets_jobs_created: usize,
    pub assets_jobs_updated: usize,
    pub assets_jobs_deleted: usize,
    #[serde(default)]
    pub shot_jobs_hydrated: usize,
    /// Distinct artists covered by a non-failed shot-job outcome.
    pub artists_processed: usize,
    pub errors: Vec<String>,
    pub details: Vec<JobDetail>,
    #[serde(default)]
    pub duration_ms: u128,
}

impl ReconcileResult {
    /// Total mutations applied (or planned, in a dry run).
    pub fn total_changes(&self) -> usize {
        self.shot_jobs_created
            + self.shot_jobs_updated
            + self.shot_jobs_deleted
            + self.assets_jobs_created
            + self.assets_jobs_updated
            + self.assets_jobs_deleted
    }
}
