//! Dry-run validation

use super::{CommandResult, execute};
use convenient_codegen::{CodegenConfig, FsBuildHost, RunMode};

/// Check every input without writing and fail if any needs regeneration
pub fn validate(config: CodegenConfig) -> CommandResult {
    println!("🔍 Validating generated code in {}", config.source_dir());
    let host = FsBuildHost::open(&config.state_dir)?;
    execute(config, host, RunMode::Validate)
}
