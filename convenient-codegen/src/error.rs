//! Error types for the code-generation runner

use std::path::PathBuf;

/// Maximum number of wrapped causes folded into a reported message
pub const MAX_CAUSE_DEPTH: usize = 2;

/// Failure raised by the external generator itself
///
/// Carries the generator's top-level message plus the messages of the
/// errors it wrapped, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ToolFailure {
    /// Top-level message as produced by the generator
    pub message: String,
    /// Wrapped cause messages, outermost first
    pub causes: Vec<String>,
}

impl ToolFailure {
    /// Create a failure without any wrapped causes
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Append a wrapped cause
    #[must_use]
    pub fn caused_by(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Failure for an entry point the generator does not implement
    pub fn unsupported(entry_point: &str) -> Self {
        Self::new(format!("Generator does not support {entry_point}()"))
    }

    /// Up to [`MAX_CAUSE_DEPTH`] cause messages, outermost first
    pub fn bounded_causes(&self) -> impl Iterator<Item = &str> {
        self.causes
            .iter()
            .take(MAX_CAUSE_DEPTH)
            .map(String::as_str)
            .filter(|cause| !cause.is_empty())
    }
}

/// Error types for runner operations
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// Bad arguments or no usable generator entry point
    #[error("{0}")]
    Config(String),

    /// The generator failed while generating
    #[error("Error while running code generator: {0}")]
    Tool(#[from] ToolFailure),

    /// Filesystem access failed
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Persisted state could not be read or written
    #[error("State error: {0}")]
    State(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] serde_yaml::Error),

    /// Include pattern is not a valid glob
    #[error("Invalid include pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl CodegenError {
    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for runner operations
pub type CodegenResult<T> = Result<T, CodegenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_causes_stops_at_two_levels() {
        let failure = ToolFailure::new("top")
            .caused_by("first")
            .caused_by("second")
            .caused_by("third");

        let causes: Vec<&str> = failure.bounded_causes().collect();
        assert_eq!(causes, vec!["first", "second"]);
    }

    #[test]
    fn tool_error_display_wraps_message() {
        let err = CodegenError::from(ToolFailure::new("boom"));
        assert_eq!(err.to_string(), "Error while running code generator: boom");
    }
}
