//! Desired-state builder — snapshot + configuration to the complete set of
//! expected managed jobs, keyed by deterministic name.
//!
//! Shots are grouped by `(tank_name, code)` first: a tracking snapshot may
//! list the same shot once per task, and repeated entries are merged with
//! their artist sets unioned. A shot whose assigned artists are all absent
//! from `target_agents` contributes no expected job; any same-named console
//! job then falls out through the differ as a deletion.
//!
//! A job whose build fails (an artist's agent cannot be resolved) is
//! recorded as an error and its name is kept in [`DesiredState::failed`] so
//! the reconciler exempts it from deletion for this run.

use std::collections::{BTreeMap, BTreeSet};

use stagesync_core::config::{AgentTarget, Config};
use stagesync_core::template;
use stagesync_core::types::{AgentRef, JobKind, JobName, ManagedJob, Snapshot};

use crate::resolve::AgentResolver;

/// Output of one desired-state build.
#[derive(Debug, Default)]
pub struct DesiredState {
    pub jobs: BTreeMap<JobName, ManagedJob>,
    /// Names whose build failed; exempt from deletion this run.
    pub failed: BTreeSet<JobName>,
    pub errors: Vec<String>,
}

struct ShotGroup<'a> {
    sequence: &'a str,
    artists: BTreeSet<&'a str>,
}

/// Build the expected job map for one reconciliation run.
///
/// `primary_id` is the already-resolved primary-storage agent, shared by
/// every job in the run.
pub fn build(
    snapshot: &Snapshot,
    config: &Config,
    primary_id: u64,
    resolver: &mut AgentResolver,
) -> DesiredState {
    let mut state = DesiredState::default();
    let mut memo: BTreeMap<String, u64> = BTreeMap::new();
    let assembly = JobAssembly { config, primary_id };

    for ((tank, code), group) in group_shots(snapshot) {
        let artists = config_artists(config, &group.artists);
        if artists.is_empty() {
            tracing::debug!("shot {} ({}) has no configured artists, no job expected", code, tank);
            continue;
        }

        let name = JobName::shot(tank, code);
        let rendered = template::expand(
            &config.path_templates.shots_template,
            &[("PROJECT", tank), ("SEQUENCE", group.sequence), ("SHOT", code)],
        );
        match enduser_agents(resolver, &mut memo, &artists, &rendered) {
            Ok(endusers) => {
                let job = assembly.job(JobKind::Shot, tank, Some(code), &artists, &rendered, endusers);
                state.jobs.insert(name, job);
            }
            Err(reason) => {
                state.errors.push(format!("failed to build shot job '{name}': {reason}"));
                state.failed.insert(name);
            }
        }
    }

    for (tank, artist_set) in group_asset_projects(snapshot, config) {
        let artists = config_artists(config, &artist_set);
        if artists.is_empty() {
            continue;
        }

        let name = JobName::assets(tank);
        let rendered =
            template::expand(&config.path_templates.assets_template, &[("PROJECT", tank)]);
        match enduser_agents(resolver, &mut memo, &artists, &rendered) {
            Ok(endusers) => {
                let job = assembly.job(JobKind::Assets, tank, None, &artists, &rendered, endusers);
                state.jobs.insert(name, job);
            }
            Err(reason) => {
                state.errors.push(format!("failed to build assets job '{name}': {reason}"));
                state.failed.insert(name);
            }
        }
    }

    state
}

/// Merge snapshot shots into unique `(tank_name, code)` groups.
fn group_shots(snapshot: &Snapshot) -> BTreeMap<(&str, &str), ShotGroup<'_>> {
    let mut groups: BTreeMap<(&str, &str), ShotGroup> = BTreeMap::new();
    for shot in &snapshot.shots {
        let tank = shot.project.tank_name.as_str();
        if tank.is_empty() {
            tracing::warn!("shot {} has no project tank name, skipping", shot.code);
            continue;
        }
        let group = groups.entry((tank, shot.code.as_str())).or_insert_with(|| ShotGroup {
            sequence: shot.sequence.as_str(),
            artists: BTreeSet::new(),
        });
        group.artists.extend(shot.assigned_artists.iter().map(String::as_str));
    }
    groups
}

/// Per project: every config-known artist assigned anywhere in it.
fn group_asset_projects<'a>(
    snapshot: &'a Snapshot,
    config: &Config,
) -> BTreeMap<&'a str, BTreeSet<&'a str>> {
    let mut projects: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (artist, tanks) in &snapshot.artist_projects {
        if !config.target_agents.contains_key(artist) {
            continue;
        }
        for tank in tanks {
            projects.entry(tank.as_str()).or_default().insert(artist.as_str());
        }
    }
    projects
}

/// Artists of a group that have a `target_agents` entry, with their targets.
fn config_artists<'c>(
    config: &'c Config,
    artists: &BTreeSet<&str>,
) -> Vec<(&'c str, &'c AgentTarget)> {
    artists
        .iter()
        .filter_map(|artist| config.target_agents.get_key_value(*artist))
        .map(|(name, target)| (name.as_str(), target))
        .collect()
}

/// One enduser entry per artist, each with their own base path. The first
/// resolution failure fails the whole job.
fn enduser_agents(
    resolver: &mut AgentResolver,
    memo: &mut BTreeMap<String, u64>,
    artists: &[(&str, &AgentTarget)],
    rendered: &str,
) -> Result<Vec<AgentRef>, String> {
    let mut agents = Vec::with_capacity(artists.len());
    for (artist, target) in artists {
        let id = match memo.get(*artist) {
            Some(id) => *id,
            None => {
                let id = resolver
                    .resolve(&format!("artist '{artist}'"), target)
                    .map_err(|e| e.to_string())?;
                memo.insert((*artist).to_owned(), id);
                id
            }
        };
        agents.push(AgentRef::enduser(id, &template::join_base(&target.base_path, rendered)));
    }
    Ok(agents)
}

/// Shared per-run pieces of job assembly: the configuration and the
/// already-resolved primary-storage agent.
struct JobAssembly<'a> {
    config: &'a Config,
    primary_id: u64,
}

impl JobAssembly<'_> {
    fn job(
        &self,
        kind: JobKind,
        tank: &str,
        shot: Option<&str>,
        artists: &[(&str, &AgentTarget)],
        rendered: &str,
        endusers: Vec<AgentRef>,
    ) -> ManagedJob {
        let primary_path = template::join_base(&self.config.primary_storage.base_path, rendered);
        let mut agents = vec![AgentRef::primary_storage(self.primary_id, &primary_path)];
        agents.extend(endusers);

        let (name, description) = match (kind, shot) {
            (JobKind::Shot, Some(code)) => {
                (JobName::shot(tank, code), format!("Shot {code} ({tank})"))
            }
            _ => (JobName::assets(tank), format!("Assets for {tank}")),
        };

        ManagedJob {
            name,
            kind,
            project: tank.to_owned(),
            shot: shot.map(str::to_owned),
            artists: artists.iter().map(|(artist, _)| (*artist).to_owned()).collect(),
            primary_path,
            agents,
            description,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use stagesync_core::config::{ConsoleSettings, PathTemplates};
    use stagesync_core::types::{ProjectRef, Shot};

    use super::*;
    use crate::testutil::{agent, StaticConsole};

    fn target_id(id: u64, base: &str) -> AgentTarget {
        AgentTarget {
            agent_id: Some(id),
            agent_name: None,
            base_path: base.to_owned(),
        }
    }

    fn config_with(targets: &[(&str, AgentTarget)]) -> Config {
        Config {
            console: ConsoleSettings {
                url: "http://console".to_owned(),
                token: Some("t".to_owned()),
            },
            target_agents: targets.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect(),
            primary_storage: target_id(1, "/mnt/storage"),
            path_templates: PathTemplates {
                shots_template: "${PROJECT}/${SEQUENCE}/${SHOT}".to_owned(),
                assets_template: "${PROJECT}/assets".to_owned(),
            },
            hydrate_on_create: false,
            sync_interval_secs: 0,
        }
    }

    fn shot(tank: &str, code: &str, sequence: &str, artists: &[&str]) -> Shot {
        Shot {
            id: 0,
            code: code.to_owned(),
            project: ProjectRef {
                name: String::new(),
                tank_name: tank.to_owned(),
            },
            sequence: sequence.to_owned(),
            assigned_artists: artists.iter().map(|a| (*a).to_owned()).collect(),
        }
    }

    #[test]
    fn duplicate_shot_entries_merge_into_one_job() {
        let config = config_with(&[("A", target_id(10, "/a")), ("B", target_id(11, "/b"))]);
        let snapshot = Snapshot {
            shots: vec![
                shot("P", "S1", "SEQ", &["A"]),
                shot("P", "S1", "SEQ", &["B"]),
            ],
            artist_projects: BTreeMap::new(),
        };
        let console = StaticConsole::with_agents(vec![]);
        let mut resolver = AgentResolver::new(&console);

        let state = build(&snapshot, &config, 1, &mut resolver);
        assert_eq!(state.jobs.len(), 1);
        let job = &state.jobs[&JobName::shot("P", "S1")];
        assert_eq!(job.artists, vec!["A", "B"]);
        let ids: Vec<u64> = job.enduser_ids().into_iter().collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn shot_with_no_configured_artists_yields_no_job() {
        let config = config_with(&[("A", target_id(10, "/a"))]);
        let snapshot = Snapshot {
            shots: vec![shot("P", "S1", "SEQ", &["Stranger"])],
            artist_projects: BTreeMap::new(),
        };
        let console = StaticConsole::with_agents(vec![]);
        let mut resolver = AgentResolver::new(&console);

        let state = build(&snapshot, &config, 1, &mut resolver);
        assert!(state.jobs.is_empty());
        assert!(state.errors.is_empty(), "filtering is not an error");
    }

    #[test]
    fn shot_without_tank_name_is_skipped() {
        let config = config_with(&[("A", target_id(10, "/a"))]);
        let snapshot = Snapshot {
            shots: vec![shot("", "S1", "SEQ", &["A"])],
            artist_projects: BTreeMap::new(),
        };
        let console = StaticConsole::with_agents(vec![]);
        let mut resolver = AgentResolver::new(&console);

        let state = build(&snapshot, &config, 1, &mut resolver);
        assert!(state.jobs.is_empty());
    }

    #[test]
    fn primary_agent_comes_first_with_shared_rendered_path() {
        let config = config_with(&[("A", target_id(10, "/Users/a/work"))]);
        let snapshot = Snapshot {
            shots: vec![shot("TST", "TST_010_0010", "TST_010", &["A"])],
            artist_projects: BTreeMap::new(),
        };
        let console = StaticConsole::with_agents(vec![]);
        let mut resolver = AgentResolver::new(&console);

        let state = build(&snapshot, &config, 1, &mut resolver);
        let job = &state.jobs[&JobName::shot("TST", "TST_010_0010")];
        assert_eq!(job.primary_path, "/mnt/storage/TST/TST_010/TST_010_0010");
        assert_eq!(job.agents[0].id, 1);
        assert_eq!(job.agents[0].path.linux, "/mnt/storage/TST/TST_010/TST_010_0010");
        assert_eq!(job.agents[1].id, 10);
        assert_eq!(job.agents[1].path.linux, "/Users/a/work/TST/TST_010/TST_010_0010");
        assert_eq!(job.agents[1].path.win, "\\Users\\a\\work\\TST\\TST_010\\TST_010_0010");
    }

    #[test]
    fn assets_job_aggregates_all_configured_artists_without_duplicates() {
        let config = config_with(&[("A", target_id(10, "/a")), ("B", target_id(11, "/b"))]);
        let mut artist_projects = BTreeMap::new();
        artist_projects.insert("A".to_owned(), vec!["P".to_owned(), "P".to_owned()]);
        artist_projects.insert("B".to_owned(), vec!["P".to_owned()]);
        artist_projects.insert("Stranger".to_owned(), vec!["P".to_owned()]);
        let snapshot = Snapshot {
            shots: vec![],
            artist_projects,
        };
        let console = StaticConsole::with_agents(vec![]);
        let mut resolver = AgentResolver::new(&console);

        let state = build(&snapshot, &config, 1, &mut resolver);
        assert_eq!(state.jobs.len(), 1);
        let job = &state.jobs[&JobName::assets("P")];
        assert_eq!(job.kind, JobKind::Assets);
        assert_eq!(job.shot, None);
        let ids: Vec<u64> = job.enduser_ids().into_iter().collect();
        assert_eq!(ids, vec![10, 11], "one enduser per distinct artist");
        assert_eq!(job.primary_path, "/mnt/storage/P/assets");
    }

    #[test]
    fn resolution_failure_marks_only_that_job() {
        let mut targets = config_with(&[("A", target_id(10, "/a"))]);
        targets.target_agents.insert(
            "B".to_owned(),
            AgentTarget {
                agent_id: None,
                agent_name: Some("missing-box".to_owned()),
                base_path: "/b".to_owned(),
            },
        );
        let snapshot = Snapshot {
            shots: vec![
                shot("P", "S1", "SEQ", &["A"]),
                shot("P", "S2", "SEQ", &["B"]),
            ],
            artist_projects: BTreeMap::new(),
        };
        let console = StaticConsole::with_agents(vec![agent(99, "some-other-box")]);
        let mut resolver = AgentResolver::new(&console);

        let state = build(&snapshot, &targets, 1, &mut resolver);
        assert_eq!(state.jobs.len(), 1, "the resolvable shot still builds");
        assert!(state.jobs.contains_key(&JobName::shot("P", "S1")));
        assert_eq!(state.failed.len(), 1);
        assert!(state.failed.contains(&JobName::shot("P", "S2")));
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].contains("HybridWork_P_S2"));
        assert!(state.errors[0].contains("missing-box"));
    }

    #[test]
    fn rebuilding_the_same_inputs_is_deterministic() {
        let config = config_with(&[("A", target_id(10, "/a")), ("B", target_id(11, "/b"))]);
        let mut artist_projects = BTreeMap::new();
        artist_projects.insert("A".to_owned(), vec!["P".to_owned()]);
        let snapshot = Snapshot {
            shots: vec![shot("P", "S1", "SEQ", &["B", "A"])],
            artist_projects,
        };
        let console = StaticConsole::with_agents(vec![]);

        let mut resolver = AgentResolver::new(&console);
        let first = build(&snapshot, &config, 1, &mut resolver);
        let mut resolver = AgentResolver::new(&console);
        let second = build(&snapshot, &config, 1, &mut resolver);

        let first_names: Vec<&JobName> = first.jobs.keys().collect();
        let second_names: Vec<&JobName> = second.jobs.keys().collect();
        assert_eq!(first_names, second_names);
        for (name, job) in &first.jobs {
            assert_eq!(job.enduser_ids(), second.jobs[name].enduser_ids());
        }
    }
}
