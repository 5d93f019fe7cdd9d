use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DAEMON_SOCKET: &str = "daemon.sock";
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

pub fn stagesync_root(home: &Path) -> PathBuf {
    home.join(".stagesync")
}

pub fn run_dir(home: &Path) -> PathBuf {
    stagesync_root(home).join("run")
}

pub fn socket_path(home: &Path) -> PathBuf {
    run_dir(home).join(DAEMON_SOCKET)
}

/// Default configuration file consulted when no `--config` is given.
pub fn default_config_path(home: &Path) -> PathBuf {
    stagesync_root(home).join("config.yaml")
}

/// Default snapshot document consulted when no `--snapshot` is given.
pub fn default_snapshot_path(home: &Path) -> PathBuf {
    stagesync_root(home).join("snapshot.json")
}
