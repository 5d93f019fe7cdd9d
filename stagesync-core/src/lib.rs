//! # stagesync-core
//!
//! Domain types, configuration, snapshot input, and path template rendering
//! for the stagesync reconciliation engine.
//!
//! The tracking-system snapshot and the YAML configuration are the two
//! inputs of a reconciliation run; both are loaded here. Everything network
//! facing lives in `stagesync-client`.

pub mod config;
pub mod error;
pub mod snapshot;
pub mod template;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, SnapshotError};
pub use types::Snapshot;
