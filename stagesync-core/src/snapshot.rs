//! Tracking-system snapshot loading.
//!
//! The snapshot is a JSON document produced by the tracking-system
//! collaborator (active shots plus artist assignments). It is read fresh for
//! every reconciliation call and never cached.

use std::path::Path;

use crate::error::SnapshotError;
use crate::types::Snapshot;

/// Load a snapshot document from a JSON file.
pub fn load(path: &Path) -> Result<Snapshot, SnapshotError> {
    let contents = std::fs::read_to_string(path).map_err(|e| SnapshotError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| SnapshotError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn loads_snapshot_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("snapshot.json");
        fs::write(
            &path,
            r#"{"shots":[{"code":"S1","project":{"tank_name":"P"},"sequence":"SEQ","assigned_artists":["A","B"]}],"artist_projects":{"A":["P"]}}"#,
        )
        .expect("write");

        let snapshot = load(&path).expect("load");
        assert_eq!(snapshot.shots.len(), 1);
        assert_eq!(snapshot.shots[0].code, "S1");
        assert_eq!(snapshot.artist_projects["A"], vec!["P"]);
    }

    #[test]
    fn empty_document_yields_empty_snapshot() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("snapshot.json");
        fs::write(&path, "{}").expect("write");

        let snapshot = load(&path).expect("load");
        assert!(snapshot.shots.is_empty());
        assert!(snapshot.artist_projects.is_empty());
    }

    #[test]
    fn parse_error_carries_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("snapshot.json");
        fs::write(&path, "not json").expect("write");

        let err = load(&path).expect_err("should fail");
        match err {
            SnapshotError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = load(&dir.path().join("absent.json")).expect_err("should fail");
        assert!(matches!(err, SnapshotError::Io { .. }));
    }
}
