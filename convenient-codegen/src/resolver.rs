//! Locating the generator program
//!
//! The resolver is owned by whoever composes the runner. Resolution happens
//! once on first use and the answer is kept for the resolver's lifetime.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Finds the generator program on a search path
#[derive(Debug)]
pub struct ToolResolver {
    program: String,
    search_path: Vec<PathBuf>,
    resolved: OnceLock<Option<PathBuf>>,
}

impl ToolResolver {
    /// Create a resolver for `program`
    pub fn new(program: impl Into<String>, search_path: Vec<PathBuf>) -> Self {
        Self {
            program: program.into(),
            search_path,
            resolved: OnceLock::new(),
        }
    }

    /// Program name being looked up
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Location of the program, or `None` if it is not on the search path
    pub fn resolve(&self) -> Option<&Path> {
        self.resolved
            .get_or_init(|| self.search())
            .as_deref()
    }

    fn search(&self) -> Option<PathBuf> {
        debug!("Finding {} on search path", self.program);
        for entry in &self.search_path {
            if entry.is_dir() {
                let candidate = entry.join(&self.program);
                if candidate.is_file() {
                    debug!("Found generator: {}", candidate.display());
                    return Some(candidate);
                }
            } else if entry.is_file()
                && entry
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.contains(self.program.as_str()))
            {
                debug!("Found generator: {}", entry.display());
                return Some(entry.clone());
            }
        }
        None
    }
}
