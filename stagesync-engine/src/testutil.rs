//! In-memory console stub for unit tests.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::Value;

use stagesync_client::{ApiError, Console, HydrateReport, JobSpec, RemoteAgent, RemoteJob, RunInfo};

/// Read-only console fake: serves fixed agents/jobs, counts calls, and
/// rejects every mutation. Mutation flows are covered by the integration
/// scenarios in `tests/`.
pub(crate) struct StaticConsole {
    agents: Vec<RemoteAgent>,
    jobs: Vec<RemoteJob>,
    fail_all: bool,
    calls: RefCell<BTreeMap<&'static str, usize>>,
}

impl StaticConsole {
    pub fn with_agents(agents: Vec<RemoteAgent>) -> Self {
        Self {
            agents,
            jobs: Vec::new(),
            fail_all: false,
            calls: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn with_jobs(jobs: Vec<RemoteJob>) -> Self {
        Self {
            agents: Vec::new(),
            jobs,
            fail_all: false,
            calls: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            agents: Vec::new(),
            jobs: Vec::new(),
            fail_all: true,
            calls: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn calls(&self, op: &'static str) -> usize {
        self.calls.borrow().get(op).copied().unwrap_or(0)
    }

    fn record(&self, op: &'static str) -> Result<(), ApiError> {
        *self.calls.borrow_mut().entry(op).or_insert(0) += 1;
        if self.fail_all {
            return Err(ApiError::Connection("console unavailable".to_owned()));
        }
        Ok(())
    }
}

impl Console for StaticConsole {
    fn jobs(&self) -> Result<Vec<RemoteJob>, ApiError> {
        self.record("jobs")?;
        Ok(self.jobs.clone())
    }

    fn job(&self, id: u64) -> Result<RemoteJob, ApiError> {
        self.record("job")?;
        self.jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("job {id}")))
    }

    fn agents(&self) -> Result<Vec<RemoteAgent>, ApiError> {
        self.record("agents")?;
        Ok(self.agents.clone())
    }

    fn create_job(&self, _spec: &JobSpec, _ignore_errors: bool) -> Result<u64, ApiError> {
        self.record("create_job")?;
        Err(ApiError::Generic("StaticConsole does not mutate".to_owned()))
    }

    fn update_job(&self, _id: u64, _body: &Value) -> Result<(), ApiError> {
        self.record("update_job")?;
        Err(ApiError::Generic("StaticConsole does not mutate".to_owned()))
    }

    fn delete_job(&self, _id: u64) -> Result<(), ApiError> {
        self.record("delete_job")?;
        Err(ApiError::Generic("StaticConsole does not mutate".to_owned()))
    }

    fn runs_for_job(&self, _job_id: u64) -> Result<Vec<RunInfo>, ApiError> {
        self.record("runs_for_job")?;
        Ok(Vec::new())
    }

    fn start_run(&self, _job_id: u64) -> Result<u64, ApiError> {
        self.record("start_run")?;
        Err(ApiError::Generic("StaticConsole does not mutate".to_owned()))
    }

    fn stop_run(&self, _run_id: u64) -> Result<(), ApiError> {
        self.record("stop_run")?;
        Err(ApiError::Generic("StaticConsole does not mutate".to_owned()))
    }

    fn hydrate(
        &self,
        _run_id: u64,
        _files: &[String],
        _agents: Option<&[u64]>,
    ) -> Result<HydrateReport, ApiError> {
        self.record("hydrate")?;
        Ok(HydrateReport::default())
    }
}

pub(crate) fn agent(id: u64, name: &str) -> RemoteAgent {
    RemoteAgent {
        id,
        name: name.to_owned(),
        rest: serde_json::Map::new(),
    }
}

pub(crate) fn remote_job(id: u64, name: &str, agent_entries: &[(u64, &str)]) -> RemoteJob {
    let agents = agent_entries
        .iter()
        .map(|(id, role)| {
            serde_json::from_value(serde_json::json!({"id": id, "role": role}))
                .expect("agent entry")
        })
        .collect();
    RemoteJob {
        id,
        name: name.to_owned(),
        agents,
        rest: serde_json::Map::new(),
    }
}
