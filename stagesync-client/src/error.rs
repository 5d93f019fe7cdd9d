//! Error types for stagesync-client.

use thiserror::Error;

/// All errors that can arise from console API calls, tagged by failure kind
/// so callers can pattern-match without unwinding.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failed before any HTTP status was received.
    #[error("connection to console failed: {0}")]
    Connection(String),

    /// The console returned 401.
    #[error("console rejected credentials: {0}")]
    Unauthorized(String),

    /// The console returned 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// A hydrate request exceeded the per-request path limit. Raised before
    /// any request is made; never silently truncated.
    #[error("hydrate accepts at most {limit} paths per request, got {got}")]
    PayloadLimit { limit: usize, got: usize },

    /// Any other 4xx/5xx, or a response body that was not valid JSON.
    #[error("{0}")]
    Generic(String),
}
