//! Three-way set comparison between expected and existing managed jobs.
//!
//! Pure: operates on the two name key-spaces only. The three sets are
//! disjoint and sorted (both inputs are ordered maps).

use std::collections::BTreeMap;

use stagesync_client::RemoteJob;
use stagesync_core::types::{JobName, ManagedJob};

/// The minimal operation sets for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffPlan {
    /// Expected but absent from the console.
    pub to_create: Vec<JobName>,
    /// Present on the console but no longer expected.
    pub to_delete: Vec<JobName>,
    /// Present on both sides; may still need an update.
    pub to_check: Vec<JobName>,
}

pub fn plan(
    expected: &BTreeMap<JobName, ManagedJob>,
    existing: &BTreeMap<JobName, RemoteJob>,
) -> DiffPlan {
    let mut plan = DiffPlan::default();
    for name in expected.keys() {
        if existing.contains_key(name) {
            plan.to_check.push(name.clone());
        } else {
            plan.to_create.push(name.clone());
        }
    }
    for name in existing.keys() {
        if !expected.contains_key(name) {
            plan.to_delete.push(name.clone());
        }
    }
    plan
}
