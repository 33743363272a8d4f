//! Argument vector handed to the generator

use crate::config::CodegenConfig;
use std::fmt;
use std::path::PathBuf;

/// Recurse into subdirectories
pub const FLAG_RECURSE: &str = "-R";
/// Report only, write nothing
pub const FLAG_NO_WRITE: &str = "-nowrite";

/// Whether the run writes generated code or only checks for drift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Regenerate out-of-date files
    #[default]
    Generate,
    /// Dry run that reports files needing regeneration
    Validate,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Generate => write!(f, "generator"),
            RunMode::Validate => write!(f, "validator"),
        }
    }
}

/// Ordered generator flags, without target paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFlags(Vec<String>);

impl RequestFlags {
    /// Build the flag list for `mode` from configuration
    pub fn from_config(config: &CodegenConfig, mode: RunMode) -> Self {
        let mut flags = vec![FLAG_RECURSE.to_string()];
        if let Some(indent) = &config.indent {
            flags.push(format!("-indent={indent}"));
        }
        if let Some(prefix) = &config.prefix {
            flags.push(format!("-prefix={prefix}"));
        }
        if let Some(path) = &config.config {
            flags.push(format!("-config={path}"));
        }
        if let Some(verbose) = config.verbose {
            flags.push(format!("-verbose={verbose}"));
        }
        if mode == RunMode::Validate {
            flags.push(FLAG_NO_WRITE.to_string());
        }
        Self(flags)
    }

    /// Flags in order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// One generator invocation: flags followed by the target path
///
/// Each source root is its own invocation, so reported paths always resolve
/// against a single base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    flags: Vec<String>,
    target: PathBuf,
}

impl GenerationRequest {
    /// Request processing a single file or directory
    pub fn for_target(flags: &RequestFlags, target: impl Into<PathBuf>) -> Self {
        Self {
            flags: flags.0.clone(),
            target: target.into(),
        }
    }

    /// Full argument vector as passed to the generator
    pub fn args(&self) -> Vec<String> {
        let mut args = self.flags.clone();
        args.push(self.target.to_string_lossy().into_owned());
        args
    }
}
