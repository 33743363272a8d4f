//! Bindings to the host build tool

use crate::detector::ChangeOracle;
use std::fmt;
use std::path::{Path, PathBuf};

/// Well-known key under which the host stores the file of the last reported error
pub const MARKER_KEY: &str = "convenient-codegen.error-file";

/// Severity of a problem reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    /// Fails the build
    Error,
    /// Informational only
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Incremental-build and problem-reporting API of the host build tool
///
/// Runs against one host are serialized by the host, so implementations
/// need no internal locking.
pub trait BuildHost {
    /// Change oracle, if the host tracks changes between runs
    fn change_oracle(&self) -> Option<&dyn ChangeOracle> {
        None
    }

    /// Tell the host that `path` (a file or a whole directory) changed on disk
    fn refresh(&mut self, path: &Path);

    /// Remove problems previously reported against `path`
    fn remove_messages(&mut self, path: &Path);

    /// Report a problem; `line` is already in the host's numbering
    fn add_message(&mut self, file: &Path, line: u32, message: &str, severity: Severity);

    /// Read a persistent per-project marker
    fn marker(&self, key: &str) -> Option<PathBuf>;

    /// Write or clear a persistent per-project marker
    fn set_marker(&mut self, key: &str, value: Option<PathBuf>);

    /// Whether the host shows recorded problems itself
    ///
    /// Such hosts get the diagnostic but no failed run on a tool error.
    fn owns_problem_display(&self) -> bool {
        false
    }
}
