//! Agent resolution — configuration target to concrete console agent id.
//!
//! Resolution order: a direct `agent_id` from configuration is returned
//! unchanged (no validation against the console); otherwise `agent_name` is
//! matched case-insensitively against the console's agent directory. The
//! directory is fetched at most once per resolver, i.e. once per
//! reconciliation run.

use stagesync_client::{Console, RemoteAgent};
use stagesync_core::config::AgentTarget;

use crate::error::EngineError;

pub struct AgentResolver<'a> {
    console: &'a dyn Console,
    directory: Option<Vec<RemoteAgent>>,
}

impl<'a> AgentResolver<'a> {
    pub fn new(console: &'a dyn Console) -> Self {
        Self {
            console,
            directory: None,
        }
    }

    /// Resolve a configuration target to an agent id.
    ///
    /// `label` names the target in error messages ("primary storage",
    /// "artist 'Matthew'", ...).
    pub fn resolve(&mut self, label: &str, target: &AgentTarget) -> Result<u64, EngineError> {
        if let Some(id) = target.agent_id {
            return Ok(id);
        }

        let Some(name) = target.agent_name.as_deref() else {
            return Err(EngineError::NoMapping {
                target: label.to_owned(),
            });
        };

        if self.directory.is_none() {
            self.directory = Some(self.console.agents()?);
        }
        self.directory
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|agent| agent.name.eq_ignore_ascii_case(name))
            .map(|agent| agent.id)
            .ok_or_else(|| EngineError::AgentNotFound {
                target: label.to_owned(),
                name: name.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{agent, StaticConsole};

    fn target_by_name(name: &str) -> AgentTarget {
        AgentTarget {
            agent_id: None,
            agent_name: Some(name.to_owned()),
            base_path: "/work".to_owned(),
        }
    }

    #[test]
    fn direct_id_bypasses_the_console() {
        // A console that fails every call: a direct id must never touch it.
        let console = StaticConsole::failing();
        let mut resolver = AgentResolver::new(&console);
        let target = AgentTarget {
            agent_id: Some(99),
            agent_name: Some("ignored".to_owned()),
            base_path: "/work".to_owned(),
        };
        assert_eq!(resolver.resolve("primary storage", &target).expect("resolve"), 99);
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        let console = StaticConsole::with_agents(vec![agent(7, "Matthew-Workstation")]);
        let mut resolver = AgentResolver::new(&console);
        let id = resolver
            .resolve("artist 'Matthew'", &target_by_name("matthew-workstation"))
            .expect("resolve");
        assert_eq!(id, 7);
    }

    #[test]
    fn unknown_name_is_agent_not_found() {
        let console = StaticConsole::with_agents(vec![agent(7, "other")]);
        let mut resolver = AgentResolver::new(&console);
        let err = resolver
            .resolve("artist 'Alex'", &target_by_name("alex-box"))
            .expect_err("should fail");
        match err {
            EngineError::AgentNotFound { target, name } => {
                assert_eq!(target, "artist 'Alex'");
                assert_eq!(name, "alex-box");
            }
            other => panic!("expected AgentNotFound, got {other:?}"),
        }
    }

    #[test]
    fn empty_mapping_is_a_configuration_error() {
        let console = StaticConsole::with_agents(vec![]);
        let mut resolver = AgentResolver::new(&console);
        let target = AgentTarget {
            agent_id: None,
            agent_name: None,
            base_path: "/work".to_owned(),
        };
        let err = resolver.resolve("artist 'A'", &target).expect_err("should fail");
        assert!(matches!(err, EngineError::NoMapping { .. }));
    }

    #[test]
    fn directory_is_fetched_once_per_resolver() {
        let console = StaticConsole::with_agents(vec![agent(7, "a"), agent(8, "b")]);
        let mut resolver = AgentResolver::new(&console);
        resolver.resolve("x", &target_by_name("a")).expect("first");
        resolver.resolve("y", &target_by_name("B")).expect("second");
        assert_eq!(console.calls("agents"), 1);
    }
}
