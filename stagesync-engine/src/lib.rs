//! # stagesync-engine
//!
//! The reconciliation engine: build the desired set of managed jobs from a
//! tracking-system snapshot, fetch the console's current managed jobs,
//! three-way diff by job name, and apply the minimal create/update/delete
//! operations — idempotently, with per-job failure isolation.
//!
//! Call [`Reconciler::run`] for a full pass. The lower-level steps
//! ([`builder::build`], [`inventory::fetch_managed`], [`diff::plan`]) are
//! public for plan/diff style tooling that wants the pieces without the
//! apply phase.

pub mod builder;
pub mod diff;
pub mod error;
pub mod inventory;
pub mod reconcile;
pub mod report;
pub mod resolve;

#[cfg(test)]
pub(crate) mod testutil;

pub use diff::DiffPlan;
pub use error::EngineError;
pub use reconcile::{ensure_run, Reconciler};
pub use report::{JobDetail, JobOutcome, ReconcileResult};
pub use resolve::AgentResolver;
