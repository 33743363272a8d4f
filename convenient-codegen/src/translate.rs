//! Translation of generator failures into located diagnostics

use crate::error::ToolFailure;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Prefix shared by every generator error about a specific source file
pub const BEAN_ERROR_PREFIX: &str = "Error in bean: ";

/// `Error in bean: <file>, Line: <line>, Message: <message>`
///
/// The file is matched lazily so it may contain commas.
#[allow(clippy::panic)]
pub static MESSAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^Error in bean: (.+?), Line: ([0-9]+), Message: (.*)$")
        .unwrap_or_else(|e| panic!("invalid message pattern: {e}"))
});

/// A problem located in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// File the problem is reported against
    pub file: PathBuf,
    /// Line as reported by the generator, at least 1
    pub line: u32,
    /// Human readable message
    pub message: String,
}

impl Diagnostic {
    /// Line number handed to the host's problem markers
    ///
    /// Always one above [`Diagnostic::line`]; hosts place markers with
    /// this offset.
    pub fn host_line(&self) -> u32 {
        self.line.saturating_add(1)
    }
}

/// Parse a message in the structured `Error in bean` format
pub fn parse_structured(message: &str) -> Option<Diagnostic> {
    let captures = MESSAGE_PATTERN.captures(message)?;
    // the pattern only admits digits, so overflow is the one parse failure
    let line = captures[2].parse::<u32>().unwrap_or(u32::MAX).max(1);
    Some(Diagnostic {
        file: PathBuf::from(&captures[1]),
        line,
        message: captures[3].to_string(),
    })
}

/// Turn a generator failure into a diagnostic
///
/// Falls back to `fallback_file` at line 1 when the message does not name
/// an existing file.
pub fn translate(failure: &ToolFailure, fallback_file: &Path) -> Diagnostic {
    let raw = failure.message.as_str();
    if let Some(diagnostic) = parse_structured(raw) {
        return diagnostic;
    }

    if let Some(file) = raw.strip_prefix(BEAN_ERROR_PREFIX) {
        let file = Path::new(file.trim());
        if file.exists() {
            let causes: Vec<&str> = failure.bounded_causes().collect();
            let message = if causes.is_empty() {
                raw.to_string()
            } else {
                causes.join(": ")
            };
            return Diagnostic {
                file: file.to_path_buf(),
                line: 1,
                message,
            };
        }
    }

    let mut message = raw.to_string();
    for cause in failure.bounded_causes() {
        message.push_str(": ");
        message.push_str(cause);
    }
    Diagnostic {
        file: fallback_file.to_path_buf(),
        line: 1,
        message,
    }
}
