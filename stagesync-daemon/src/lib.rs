//! Daemon runtime: file watcher + periodic trigger + Unix-socket control
//! server, all funnelling reconciliations through one single-consumer queue.
//!
//! The engine itself carries no mutual exclusion; this queue is the
//! serialization mechanism that keeps concurrent triggers (watcher events,
//! socket requests, interval ticks) from producing overlapping runs.

mod error;
pub mod paths;
pub mod protocol;
mod runtime;

pub use error::DaemonError;
pub use protocol::{
    request_status, request_stop, request_sync, send_request, DaemonRequest, DaemonResponse,
};
pub use runtime::{run, start_blocking, DaemonSettings};
