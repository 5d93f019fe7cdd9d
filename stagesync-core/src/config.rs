//! YAML configuration for a stagesync installation.
//!
//! Every loader takes an explicit path; nothing here consults the
//! environment except the [`ConsoleSettings::token`] fallback.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

/// Environment variable consulted when `console.token` is absent.
pub const TOKEN_ENV: &str = "STAGESYNC_TOKEN";

/// Root of the stagesync YAML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub console: ConsoleSettings,
    /// Artist name to the agent that receives their copies.
    #[serde(default)]
    pub target_agents: BTreeMap<String, AgentTarget>,
    pub primary_storage: AgentTarget,
    #[serde(default)]
    pub path_templates: PathTemplates,
    /// Follow a successful shot-job create with a run + hydrate of the
    /// shot folder.
    #[serde(default)]
    pub hydrate_on_create: bool,
    /// Daemon-only: seconds between periodic reconciliations (0 = disabled).
    #[serde(default)]
    pub sync_interval_secs: u64,
}

/// Connection settings for the orchestration console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ConsoleSettings {
    /// API token: the configured value, else the `STAGESYNC_TOKEN`
    /// environment variable.
    pub fn token(&self) -> Result<String, ConfigError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        std::env::var(TOKEN_ENV).map_err(|_| ConfigError::MissingToken { env_var: TOKEN_ENV })
    }
}

/// Maps an artist or the primary-storage role to a concrete console agent.
///
/// A direct `agent_id` wins and is never validated against the console;
/// otherwise `agent_name` is looked up case-insensitively in the console's
/// agent directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    pub base_path: String,
}

/// Relative path templates with `${PROJECT}`, `${SEQUENCE}`, `${SHOT}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTemplates {
    pub shots_template: String,
    pub assets_template: String,
}

impl Default for PathTemplates {
    fn default() -> Self {
        Self {
            shots_template: "${PROJECT}/2_WORK/1_SEQUENCES/${SEQUENCE}/${SHOT}".to_owned(),
            assets_template: "${PROJECT}/2_WORK/2_ASSETS".to_owned(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// Returns `ConfigError::Parse` (with path and line context) on
    /// malformed YAML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
