//! # stagesync-client
//!
//! Blocking REST client for the orchestration console (bearer-token
//! authenticated, JSON bodies), plus the [`Console`] trait the engine
//! consumes so tests can substitute an in-memory fake.
//!
//! Transport concerns only: no retries, no backoff, one call at a time.

pub mod api;
pub mod error;
pub mod types;

pub use api::{Console, ConsoleClient, MAX_HYDRATE_PATHS};
pub use error::ApiError;
pub use types::{HydrateReport, JobSpec, RemoteAgent, RemoteJob, RunInfo};
