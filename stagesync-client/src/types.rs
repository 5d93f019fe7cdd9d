//! Wire types for the console REST surface.
//!
//! Fetched bodies keep their unknown fields in a flattened map so a full
//! update can round-trip everything the server sent, minus the
//! server-populated read-only keys.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use stagesync_core::types::{AgentRef, ManagedJob};

/// Wire value of the hybrid-work job type.
pub const HYBRID_WORK_TYPE: &str = "hybrid_work";

/// Server-populated keys stripped from a fetched job body before a full
/// replace (`PUT /jobs/{id}`).
pub const READ_ONLY_FIELDS: &[&str] = &[
    "id",
    "status",
    "created_at",
    "updated_at",
    "last_run_id",
    "stats",
];

// ---------------------------------------------------------------------------
// Fetched representations
// ---------------------------------------------------------------------------

/// One agent entry on a fetched job. Role is kept as the raw wire string;
/// the console may grow roles this crate does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAgentEntry {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// A job as currently held by the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteJob {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub agents: Vec<RemoteAgentEntry>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl RemoteJob {
    /// Ids of all enduser agents currently on the job, as a set.
    pub fn enduser_ids(&self) -> BTreeSet<u64> {
        self.agents
            .iter()
            .filter(|a| a.role.as_deref() == Some("enduser"))
            .map(|a| a.id)
            .collect()
    }

    /// Full-replace body: everything the server sent minus read-only
    /// fields, with the `agents` array replaced wholesale.
    pub fn update_body(&self, agents: &[AgentRef]) -> Result<Value, serde_json::Error> {
        let mut body = Map::new();
        body.insert("name".to_owned(), Value::String(self.name.clone()));
        for (key, value) in &self.rest {
            if READ_ONLY_FIELDS.contains(&key.as_str()) {
                continue;
            }
            body.insert(key.clone(), value.clone());
        }
        body.insert("agents".to_owned(), serde_json::to_value(agents)?);
        Ok(Value::Object(body))
    }
}

/// An agent registered with the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAgent {
    pub id: u64,
    pub name: String,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// A job run as reported by the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub id: u64,
    #[serde(default)]
    pub job_id: Option<u64>,
    #[serde(default)]
    pub status: String,
}

impl RunInfo {
    /// Whether this run is still in progress on the console side.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "running" | "active" | "in_progress"
        )
    }
}

// ---------------------------------------------------------------------------
// Create payload
// ---------------------------------------------------------------------------

/// `POST /jobs` body for a managed job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub description: String,
    pub agents: Vec<AgentRef>,
}

impl From<&ManagedJob> for JobSpec {
    fn from(job: &ManagedJob) -> Self {
        Self {
            name: job.name.0.clone(),
            job_type: HYBRID_WORK_TYPE.to_owned(),
            description: job.description.clone(),
            agents: job.agents.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hydrate
// ---------------------------------------------------------------------------

/// Per-agent delivery status in a hydrate response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrateAgentStatus {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub status: String,
}

/// Response of `PUT /runs/{id}/files/hydrate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HydrateReport {
    #[serde(default)]
    pub agents: Vec<HydrateAgentStatus>,
}

impl HydrateReport {
    /// Number of agents the hydrate request was actually sent to.
    pub fn sent_count(&self) -> usize {
        self.agents.iter().filter(|a| a.status == "sent").count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;
    use stagesync_core::types::{AgentRef, JobKind, JobName, ManagedJob};

    use super::*;

    fn fetched_job() -> RemoteJob {
        serde_json::from_value(json!({
            "id": 17,
            "name": "HybridWork_TST_Assets",
            "type": "hybrid_work",
            "description": "Assets for TST",
            "status": "synced",
            "created_at": "2024-03-01T10:00:00Z",
            "stats": {"files": 120},
            "agents": [
                {"id": 1, "role": "primary_storage", "permission": "rw"},
                {"id": 42, "role": "enduser", "permission": "rw"}
            ]
        }))
        .expect("deserialize")
    }

    #[test]
    fn enduser_ids_skips_primary_storage() {
        let job = fetched_job();
        let ids: Vec<u64> = job.enduser_ids().into_iter().collect();
        assert_eq!(ids, vec![42]);
    }

    #[test]
    fn update_body_strips_read_only_fields() {
        let job = fetched_job();
        let agents = vec![AgentRef::primary_storage(1, "/mnt/TST"), AgentRef::enduser(7, "/w/TST")];
        let body = job.update_body(&agents).expect("body");

        assert_eq!(body["name"], "HybridWork_TST_Assets");
        assert_eq!(body["type"], "hybrid_work");
        assert_eq!(body["description"], "Assets for TST");
        assert!(body.get("id").is_none());
        assert!(body.get("status").is_none());
        assert!(body.get("created_at").is_none());
        assert!(body.get("stats").is_none());

        let agents = body["agents"].as_array().expect("agents array");
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[1]["id"], 7);
        assert_eq!(agents[1]["role"], "enduser");
    }

    #[test]
    fn job_spec_wire_shape() {
        let job = ManagedJob {
            name: JobName::shot("P", "S1"),
            kind: JobKind::Shot,
            project: "P".to_owned(),
            shot: Some("S1".to_owned()),
            artists: vec!["A".to_owned()],
            primary_path: "/mnt/P/SEQ/S1".to_owned(),
            agents: vec![
                AgentRef::primary_storage(1, "/mnt/P/SEQ/S1"),
                AgentRef::enduser(42, "/work/P/SEQ/S1"),
            ],
            description: "Shot S1 (P)".to_owned(),
        };
        let value = serde_json::to_value(JobSpec::from(&job)).expect("serialize");

        assert_eq!(value["name"], "HybridWork_P_S1");
        assert_eq!(value["type"], "hybrid_work");
        assert_eq!(value["agents"][0]["role"], "primary_storage");
        assert_eq!(value["agents"][1]["path"]["win"], "\\work\\P\\SEQ\\S1");
        assert_eq!(value["agents"][1]["path"]["osx"], "/work/P/SEQ/S1");
    }

    #[test]
    fn run_activity_is_case_insensitive() {
        let run: RunInfo =
            serde_json::from_value(json!({"id": 3, "status": "Running"})).expect("deserialize");
        assert!(run.is_active());
        let run: RunInfo =
            serde_json::from_value(json!({"id": 4, "status": "finished"})).expect("deserialize");
        assert!(!run.is_active());
    }

    #[test]
    fn hydrate_report_counts_sent_agents() {
        let report: HydrateReport = serde_json::from_value(json!({
            "agents": [
                {"id": 42, "status": "sent"},
                {"id": 7, "status": "offline"}
            ]
        }))
        .expect("deserialize");
        assert_eq!(report.sent_count(), 1);
    }
}
