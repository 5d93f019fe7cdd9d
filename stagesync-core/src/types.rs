//! Domain types for the stagesync reconciliation engine.
//!
//! Jobs are identified by name alone: the deterministic job name is the only
//! key used to match expected against existing jobs across a reconciliation
//! pass. Numeric console ids never participate in matching.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name prefix marking a job as owned by the reconciliation engine.
pub const MANAGED_PREFIX: &str = "HybridWork_";

const ASSETS_SUFFIX: &str = "_Assets";

// ---------------------------------------------------------------------------
// Job identity
// ---------------------------------------------------------------------------

/// A strongly-typed managed job name.
///
/// Shot jobs are named `HybridWork_{tank_name}_{shot_code}`; per-project
/// asset jobs are named `HybridWork_{tank_name}_Assets`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobName(pub String);

impl JobName {
    /// Deterministic name for a shot job.
    pub fn shot(tank_name: &str, shot_code: &str) -> Self {
        Self(format!("{MANAGED_PREFIX}{tank_name}_{shot_code}"))
    }

    /// Deterministic name for a per-project assets job.
    pub fn assets(tank_name: &str) -> Self {
        Self(format!("{MANAGED_PREFIX}{tank_name}{ASSETS_SUFFIX}"))
    }

    /// Whether a raw console job name belongs to the reconciliation engine.
    pub fn is_managed(name: &str) -> bool {
        name.starts_with(MANAGED_PREFIX)
    }

    /// Job kind inferred from the name suffix.
    pub fn kind(&self) -> JobKind {
        if self.0.ends_with(ASSETS_SUFFIX) {
            JobKind::Assets
        } else {
            JobKind::Shot
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for JobName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The category of a managed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Shot,
    Assets,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Shot => write!(f, "shot"),
            JobKind::Assets => write!(f, "assets"),
        }
    }
}

/// Role of an agent within a managed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// The single authoritative source for the job's files.
    PrimaryStorage,
    /// A per-artist destination that receives a synchronized copy.
    Enduser,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Per-OS path variants for one agent.
///
/// The POSIX rendering is canonical: `linux` and `osx` carry it verbatim and
/// `win` is the same string with every `/` replaced by `\`. The variants are
/// never specified independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSet {
    pub linux: String,
    pub win: String,
    pub osx: String,
}

impl PathSet {
    pub fn from_posix(path: &str) -> Self {
        Self {
            linux: path.to_owned(),
            win: path.replace('/', "\\"),
            osx: path.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Managed jobs
// ---------------------------------------------------------------------------

/// One agent entry of a managed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRef {
    pub id: u64,
    pub role: AgentRole,
    pub permission: String,
    pub path: PathSet,
}

impl AgentRef {
    pub fn primary_storage(id: u64, path: &str) -> Self {
        Self {
            id,
            role: AgentRole::PrimaryStorage,
            permission: "rw".to_owned(),
            path: PathSet::from_posix(path),
        }
    }

    pub fn enduser(id: u64, path: &str) -> Self {
        Self {
            id,
            role: AgentRole::Enduser,
            permission: "rw".to_owned(),
            path: PathSet::from_posix(path),
        }
    }
}

/// A managed job as the engine expects it to exist in the console.
///
/// Invariant: exactly one `primary_storage` agent, zero or more `enduser`
/// agents — one per distinct valid artist assigned to the job's shot or
/// project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedJob {
    pub name: JobName,
    pub kind: JobKind,
    /// Project tank name (short code used to build paths).
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shot: Option<String>,
    pub artists: Vec<String>,
    /// Canonical path on the primary storage agent.
    pub primary_path: String,
    pub agents: Vec<AgentRef>,
    pub description: String,
}

impl ManagedJob {
    /// Ids of all enduser agents, as a set (ordering is not significant).
    pub fn enduser_ids(&self) -> BTreeSet<u64> {
        self.agents
            .iter()
            .filter(|a| a.role == AgentRole::Enduser)
            .map(|a| a.id)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tracking-system snapshot
// ---------------------------------------------------------------------------

/// Project reference as carried by the tracking system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    #[serde(default)]
    pub name: String,
    pub tank_name: String,
}

/// One active shot with its task assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shot {
    #[serde(default)]
    pub id: i64,
    pub code: String,
    pub project: ProjectRef,
    #[serde(default)]
    pub sequence: String,
    #[serde(default)]
    pub assigned_artists: Vec<String>,
}

/// Point-in-time desired-state input derived from the tracking system.
///
/// Produced fresh per reconciliation call and never persisted; the console
/// is the system of record for existing jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub shots: Vec<Shot>,
    /// Artist name to the tank names of every project they work on.
    #[serde(default)]
    pub artist_projects: BTreeMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
