//! Error types for stagesync-engine.

use thiserror::Error;

use stagesync_client::ApiError;

/// All errors that can arise while building or applying desired state.
///
/// Per-job failures are formatted into the run result's error list; the only
/// run-fatal cases are handled inside [`crate::Reconciler::run`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration carries neither a direct agent id nor an agent name
    /// for the target.
    #[error("no agent mapping for {target}: set agent_id or agent_name")]
    NoMapping { target: String },

    /// Name lookup against the console's agent directory found no match.
    #[error("agent '{name}' for {target} not found in console directory")]
    AgentNotFound { target: String, name: String },

    /// A console API call failed.
    #[error("console API error: {0}")]
    Api(#[from] ApiError),
}
