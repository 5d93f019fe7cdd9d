//! The reconciler — applies the diff plan one job at a time.
//!
//! Every per-job failure is recorded and the loop continues; the run as a
//! whole always completes and returns a result. The two precondition
//! failures that end a run early (primary-storage resolution and the
//! inventory fetch) still return a result, carrying that single error and
//! zero counts.
//!
//! There is no mutual exclusion here: overlapping runs can race. Callers
//! that may be triggered concurrently must serialize invocations, e.g.
//! through the daemon's single-consumer queue.

use std::collections::BTreeSet;
use std::time::Instant;

use stagesync_client::{Console, JobSpec, RemoteJob};
use stagesync_core::config::Config;
use stagesync_core::types::{JobKind, JobName, ManagedJob, Snapshot};

use crate::error::EngineError;
use crate::report::{JobDetail, JobOutcome, ReconcileResult};
use crate::resolve::AgentResolver;
use crate::{builder, diff, inventory};

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler<'a> {
    console: &'a dyn Console,
    config: &'a Config,
}

impl<'a> Reconciler<'a> {
    pub fn new(console: &'a dyn Console, config: &'a Config) -> Self {
        Self { console, config }
    }

    /// One full reconciliation pass over a fresh snapshot.
    ///
    /// With `dry_run` the plan is computed and counted but no mutating call
    /// is issued (inventory and agent-directory reads still happen).
    pub fn run(&self, snapshot: &Snapshot, dry_run: bool) -> ReconcileResult {
        let started = Instant::now();
        let mut state = RunState::new(dry_run);
        let mut resolver = AgentResolver::new(self.console);

        // Precondition: without the primary-storage agent no job can be
        // built, so this failure ends the run with a single error.
        let primary_id = match resolver.resolve("primary storage", &self.config.primary_storage) {
            Ok(id) => id,
            Err(err) => {
                state.fail(format!("primary storage agent could not be resolved: {err}"));
                return state.finish(started);
            }
        };

        let desired = builder::build(snapshot, self.config, primary_id, &mut resolver);
        for error in &desired.errors {
            state.fail(error.clone());
        }

        let existing = match inventory::fetch_managed(self.console) {
            Ok(existing) => existing,
            Err(err) => {
                state.fail(format!("failed to list managed jobs: {err}"));
                return state.finish(started);
            }
        };

        let plan = diff::plan(&desired.jobs, &existing);
        tracing::info!(
            "reconcile plan: {} to create, {} to delete, {} to check",
            plan.to_create.len(),
            plan.to_delete.len(),
            plan.to_check.len(),
        );

        for name in &plan.to_delete {
            if desired.failed.contains(name) {
                tracing::warn!("not deleting '{}': its rebuild failed this run", name);
                continue;
            }
            let Some(remote) = existing.get(name) else { continue };
            self.apply_delete(name, remote, &mut state);
        }

        for name in &plan.to_create {
            let Some(job) = desired.jobs.get(name) else { continue };
            self.apply_create(job, &mut state);
        }

        for name in &plan.to_check {
            let (Some(job), Some(remote)) = (desired.jobs.get(name), existing.get(name)) else {
                continue;
            };
            self.apply_check(job, remote, &mut state);
        }

        state.finish(started)
    }

    fn apply_delete(&self, name: &JobName, remote: &RemoteJob, state: &mut RunState) {
        if state.dry_run {
            state.count(name.kind(), Op::Delete);
            state.details.push(JobDetail::for_name(name, JobOutcome::Deleted));
            return;
        }

        match self.console.delete_job(remote.id) {
            Ok(()) => {
                tracing::info!("deleted managed job '{}'", name);
                state.count(name.kind(), Op::Delete);
                state.details.push(JobDetail::for_name(name, JobOutcome::Deleted));
            }
            Err(err) => {
                let message = format!("failed to delete job '{name}': {err}");
                state.fail(message.clone());
                state.details.push(JobDetail::for_name(name, JobOutcome::Failed).with_error(&message));
            }
        }
    }

    fn apply_create(&self, job: &ManagedJob, state: &mut RunState) {
        if state.dry_run {
            state.count(job.kind, Op::Create);
            state.track_artists(job);
            state.details.push(JobDetail::for_job(job, JobOutcome::Created));
            return;
        }

        // Best-effort mode: the console tolerates partial validation
        // failures instead of rejecting the whole payload.
        match self.console.create_job(&JobSpec::from(job), true) {
            Ok(id) => {
                tracing::info!("created job '{}' with {} agents", job.name, job.agents.len());
                state.count(job.kind, Op::Create);
                state.track_artists(job);
                let mut detail = JobDetail::for_job(job, JobOutcome::Created);
                if self.config.hydrate_on_create && job.kind == JobKind::Shot {
                    detail.hydrated = self.hydrate_created(id, job, state);
                }
                state.details.push(detail);
            }
            Err(err) => {
                let message = format!("failed to create job '{}': {err}", job.name);
                state.fail(message.clone());
                state.details.push(JobDetail::for_job(job, JobOutcome::Failed).with_error(&message));
            }
        }
    }

    fn apply_check(&self, job: &ManagedJob, remote: &RemoteJob, state: &mut RunState) {
        let current = remote.enduser_ids();
        let wanted = job.enduser_ids();
        if current == wanted {
            // Equal enduser sets mean no call at all — changed paths alone
            // never trigger an update.
            tracing::debug!("job '{}' unchanged", job.name);
            state.track_artists(job);
            state.details.push(JobDetail::for_job(job, JobOutcome::Unchanged));
            return;
        }

        if state.dry_run {
            state.count(job.kind, Op::Update);
            state.track_artists(job);
            state.details.push(JobDetail::for_job(job, JobOutcome::Updated));
            return;
        }

        let body = match remote.update_body(&job.agents) {
            Ok(body) => body,
            Err(err) => {
                let message = format!("failed to encode update for '{}': {err}", job.name);
                state.fail(message.clone());
                state.details.push(JobDetail::for_job(job, JobOutcome::Failed).with_error(&message));
                return;
            }
        };

        match self.console.update_job(remote.id, &body) {
            Ok(()) => {
                tracing::info!(
                    "updated job '{}': endusers {:?} -> {:?}",
                    job.name,
                    current,
                    wanted,
                );
                state.count(job.kind, Op::Update);
                state.track_artists(job);
                state.details.push(JobDetail::for_job(job, JobOutcome::Updated));
            }
            Err(err) => {
                let message = format!("failed to update job '{}': {err}", job.name);
                state.fail(message.clone());
                state.details.push(JobDetail::for_job(job, JobOutcome::Failed).with_error(&message));
            }
        }
    }

    /// Post-create hydration of the shot folder. Failures are recorded but
    /// never fail the create that preceded them.
    fn hydrate_created(&self, job_id: u64, job: &ManagedJob, state: &mut RunState) -> bool {
        let run_id = match ensure_run(self.console, job_id) {
            Ok(id) => id,
            Err(err) => {
                state.fail(format!("failed to start run for '{}': {err}", job.name));
                return false;
            }
        };

        let endusers: Vec<u64> = job.enduser_ids().into_iter().collect();
        match self
            .console
            .hydrate(run_id, std::slice::from_ref(&job.primary_path), Some(&endusers))
        {
            Ok(report) if report.sent_count() > 0 => {
                state.shot_hydrated += 1;
                true
            }
            Ok(_) => false,
            Err(err) => {
                state.fail(format!("failed to hydrate '{}': {err}", job.name));
                false
            }
        }
    }
}

/// Active run id for a job, starting a new run when none is in progress.
pub fn ensure_run(console: &dyn Console, job_id: u64) -> Result<u64, EngineError> {
    for run in console.runs_for_job(job_id)? {
        if run.is_active() {
            return Ok(run.id);
        }
    }
    Ok(console.start_run(job_id)?)
}

// ---------------------------------------------------------------------------
// Run accumulator
// ---------------------------------------------------------------------------

enum Op {
    Create,
    Update,
    Delete,
}

/// Working state of one run; flattened by [`RunState::finish`].
struct RunState {
    dry_run: bool,
    shot_created: usize,
    shot_updated: usize,
    shot_deleted: usize,
    assets_created: usize,
    assets_updated: usize,
    assets_deleted: usize,
    shot_hydrated: usize,
    artists: BTreeSet<String>,
    errors: Vec<String>,
    details: Vec<JobDetail>,
}

impl RunState {
    fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            shot_created: 0,
            shot_updated: 0,
            shot_deleted: 0,
            assets_created: 0,
            assets_updated: 0,
            assets_deleted: 0,
            shot_hydrated: 0,
            artists: BTreeSet::new(),
            errors: Vec::new(),
            details: Vec::new(),
        }
    }

    fn count(&mut self, kind: JobKind, op: Op) {
        let slot = match (kind, op) {
            (JobKind::Shot, Op::Create) => &mut self.shot_created,
            (JobKind::Shot, Op::Update) => &mut self.shot_updated,
            (JobKind::Shot, Op::Delete) => &mut self.shot_deleted,
            (JobKind::Assets, Op::Create) => &mut self.assets_created,
            (JobKind::Assets, Op::Update) => &mut self.assets_updated,
            (JobKind::Assets, Op::Delete) => &mut self.assets_deleted,
        };
        *slot += 1;
    }

    fn track_artists(&mut self, job: &ManagedJob) {
        if job.kind == JobKind::Shot {
            self.artists.extend(job.artists.iter().cloned());
        }
    }

    fn fail(&mut self, message: String) {
        tracing::error!("{}", message);
        self.errors.push(message);
    }

    fn finish(self, started: Instant) -> ReconcileResult {
        ReconcileResult {
            dry_run: self.dry_run,
            shot_jobs_created: self.shot_created,
            shot_jobs_updated: self.shot_updated,
            shot_jobs_deleted: self.shot_deleted,
            assets_jobs_created: self.assets_created,
            assets_jobs_updated: self.assets_updated,
            assets_jobs_deleted: self.assets_deleted,
            shot_jobs_hydrated: self.shot_hydrated,
            artists_processed: self.artists.len(),
            errors: self.errors,
            details: self.details,
            duration_ms: started.elapsed().as_millis(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests (fatal preconditions; full scenarios live in tests/)
// ---------------------------------------------------------------------------
