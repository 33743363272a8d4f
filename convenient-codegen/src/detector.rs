//! Changed-file detection
//!
//! Decides which generator inputs under a source root need regeneration,
//! asking the host's change oracle when it has one. Without an oracle the
//! answer is conservatively "everything changed".

use crate::error::CodegenResult;
use glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Glob selecting generator inputs, matched against root-relative paths
#[derive(Debug, Clone)]
pub struct IncludePattern {
    pattern: Pattern,
}

impl IncludePattern {
    /// Compile a glob such as `**/*.java`
    pub fn new(glob: &str) -> CodegenResult<Self> {
        Ok(Self {
            pattern: Pattern::new(glob)?,
        })
    }

    /// Whether a path relative to the source root is an input
    pub fn matches(&self, relative: &Path) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        // `**/` requires at least one directory level, so also try the bare name
        // for files sitting directly in the root
        self.pattern.matches_path_with(relative, options)
            || (relative.components().count() == 1
                && self
                    .pattern
                    .as_str()
                    .strip_prefix("**/")
                    .and_then(|rest| Pattern::new(rest).ok())
                    .is_some_and(|rest| rest.matches_path_with(relative, options)))
    }

    /// The glob text
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Host-provided "what changed since the last run" query
pub trait ChangeOracle {
    /// Whether incremental information is available for `base`
    fn is_incremental(&self, base: &Path) -> bool;

    /// Files under `base` matching `include` that changed since the last run
    ///
    /// Returns `Ok(None)` when the whole directory must be treated as changed.
    fn changed_files(
        &self,
        base: &Path,
        include: &IncludePattern,
    ) -> CodegenResult<Option<Vec<PathBuf>>>;
}

/// Set of files needing regeneration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSet {
    /// No incremental information; treat everything as changed
    Unknown,
    /// Nothing to do
    Empty,
    /// These files changed
    Paths(BTreeSet<PathBuf>),
}

impl ChangeSet {
    /// Whether the generator has nothing to do
    pub fn is_empty(&self) -> bool {
        matches!(self, ChangeSet::Empty)
    }

    /// Known changed files, empty for `Unknown`
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        let paths = match self {
            ChangeSet::Paths(paths) => Some(paths.iter().map(PathBuf::as_path)),
            _ => None,
        };
        paths.into_iter().flatten()
    }

    /// Target path for the generator
    ///
    /// A single changed file is passed directly; anything else hands the
    /// whole `base` to the generator, which decides what to process.
    pub fn target(&self, base: &Path) -> Option<PathBuf> {
        match self {
            ChangeSet::Empty => None,
            ChangeSet::Paths(paths) if paths.len() == 1 => paths.iter().next().cloned(),
            ChangeSet::Paths(_) | ChangeSet::Unknown => Some(base.to_path_buf()),
        }
    }
}

/// Determine which files under `base` need regeneration
///
/// A blank or missing `base` yields [`ChangeSet::Empty`].
pub fn detect(
    base: &Path,
    oracle: Option<&dyn ChangeOracle>,
    include: &IncludePattern,
) -> CodegenResult<ChangeSet> {
    if base.as_os_str().is_empty() || !base.exists() {
        debug!("Source root {} not present", base.display());
        return Ok(ChangeSet::Empty);
    }
    let Some(oracle) = oracle.filter(|oracle| oracle.is_incremental(base)) else {
        debug!("No incremental state for {}", base.display());
        return Ok(ChangeSet::Unknown);
    };
    match oracle.changed_files(base, include)? {
        None => Ok(ChangeSet::Unknown),
        Some(files) if files.is_empty() => Ok(ChangeSet::Empty),
        Some(files) => Ok(ChangeSet::Paths(
            files
                .into_iter()
                .map(|file| if file.is_absolute() { file } else { base.join(file) })
                .collect(),
        )),
    }
}
