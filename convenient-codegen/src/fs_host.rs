//! Filesystem-backed host for standalone use
//!
//! Persists markers and problems as JSON in the state directory and uses a
//! [`FingerprintOracle`] for change tracking.

use crate::detector::{ChangeOracle, IncludePattern};
use crate::error::{CodegenError, CodegenResult};
use crate::fingerprint::{FingerprintOracle, atomic_write};
use crate::host::{BuildHost, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// State file name inside the state directory
pub const STATE_FILE: &str = "state.json";

/// A problem stored between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// File the problem belongs to
    pub file: PathBuf,
    /// Line in host numbering
    pub line: u32,
    /// Problem text
    pub message: String,
    /// Problem severity
    pub severity: Severity,
}

/// Persistent per-project host state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostState {
    /// Named markers
    #[serde(default)]
    pub markers: BTreeMap<String, PathBuf>,
    /// Problems currently reported
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
    /// When the state was last saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
}

/// Host that keeps its state in a directory
#[derive(Debug)]
pub struct FsBuildHost {
    state_path: PathBuf,
    state: HostState,
    oracle: FingerprintOracle,
    refreshed: Vec<PathBuf>,
}

impl FsBuildHost {
    /// Open (or start) the state kept in `state_dir`
    pub fn open(state_dir: &Path) -> CodegenResult<Self> {
        let state_path = state_dir.join(STATE_FILE);
        let state = if state_path.exists() {
            let content = fs::read(&state_path).map_err(|e| CodegenError::io(&state_path, e))?;
            serde_json::from_slice(&content)?
        } else {
            HostState::default()
        };
        Ok(Self {
            state_path,
            state,
            oracle: FingerprintOracle::open(state_dir)?,
            refreshed: Vec::new(),
        })
    }

    /// Current persistent state
    pub fn state(&self) -> &HostState {
        &self.state
    }

    /// Paths refreshed during this session
    pub fn refreshed(&self) -> &[PathBuf] {
        &self.refreshed
    }

    /// Record fingerprints for `roots` so the next run only sees new changes
    pub fn commit_roots<'a>(
        &mut self,
        roots: impl IntoIterator<Item = &'a Path>,
        include: &IncludePattern,
    ) -> CodegenResult<()> {
        for root in roots {
            if root.as_os_str().is_empty() || !root.exists() {
                continue;
            }
            let _ = self.oracle.commit(root, include)?;
        }
        Ok(())
    }

    /// Number of files fingerprinted under `root`
    pub fn tracked_files(&self, root: &Path) -> usize {
        self.oracle.tracked(root)
    }

    /// Forget fingerprints so the next run regenerates everything
    pub fn forget_fingerprints(&mut self) {
        self.oracle.forget_all();
    }

    /// Drop fingerprints, markers and problems
    pub fn reset(&mut self) {
        info!("Resetting state in {}", self.state_path.display());
        self.oracle.forget_all();
        self.state = HostState::default();
    }

    /// Persist state and fingerprints
    pub fn save(&mut self) -> CodegenResult<()> {
        self.state.last_run = Some(Utc::now());
        let data = serde_json::to_vec_pretty(&self.state)?;
        atomic_write(&self.state_path, &data)?;
        self.oracle.save()
    }
}

impl BuildHost for FsBuildHost {
    fn change_oracle(&self) -> Option<&dyn ChangeOracle> {
        Some(&self.oracle)
    }

    fn refresh(&mut self, path: &Path) {
        debug!("Refresh {}", path.display());
        self.refreshed.push(path.to_path_buf());
    }

    fn remove_messages(&mut self, path: &Path) {
        self.state.messages.retain(|message| message.file != path);
    }

    fn add_message(&mut self, file: &Path, line: u32, message: &str, severity: Severity) {
        self.state.messages.push(StoredMessage {
            file: file.to_path_buf(),
            line,
            message: message.to_string(),
            severity,
        });
    }

    fn marker(&self, key: &str) -> Option<PathBuf> {
        self.state.markers.get(key).cloned()
    }

    fn set_marker(&mut self, key: &str, value: Option<PathBuf>) {
        match value {
            Some(value) => {
                let _ = self.state.markers.insert(key.to_string(), value);
            }
            None => {
                let _ = self.state.markers.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MARKER_KEY;
    use tempfile::TempDir;

    #[test]
    fn state_round_trips_through_disk() {
        let temp = TempDir::new().unwrap();
        let state_dir = temp.path().join(".genzel");

        let mut host = FsBuildHost::open(&state_dir).unwrap();
        host.add_message(Path::new("A.java"), 4, "bad", Severity::Error);
        host.set_marker(MARKER_KEY, Some(PathBuf::from("A.java")));
        host.save().unwrap();

        let reopened = FsBuildHost::open(&state_dir).unwrap();
        assert_eq!(reopened.marker(MARKER_KEY), Some(PathBuf::from("A.java")));
        assert_eq!(reopened.state().messages.len(), 1);
        assert!(reopened.state().last_run.is_some());
    }

    #[test]
    fn remove_messages_only_touches_that_file() {
        let temp = TempDir::new().unwrap();
        let mut host = FsBuildHost::open(temp.path()).unwrap();
        host.add_message(Path::new("A.java"), 2, "a", Severity::Error);
        host.add_message(Path::new("B.java"), 2, "b", Severity::Warning);

        host.remove_messages(Path::new("A.java"));
        assert_eq!(host.state().messages.len(), 1);
        assert_eq!(host.state().messages[0].file, PathBuf::from("B.java"));
    }

    #[test]
    fn oracle_becomes_incremental_after_commit() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("A.java"), "class A {}").unwrap();
        let include = IncludePattern::new("**/*.java").unwrap();

        let mut host = FsBuildHost::open(&temp.path().join(".genzel")).unwrap();
        assert!(!host.change_oracle().unwrap().is_incremental(&src));

        host.commit_roots([src.as_path(), Path::new("")], &include).unwrap();
        assert!(host.change_oracle().unwrap().is_incremental(&src));
        assert_eq!(host.tracked_files(&src), 1);

        host.reset();
        assert!(!host.change_oracle().unwrap().is_incremental(&src));
        assert_eq!(host.marker(MARKER_KEY), None);
    }
}
