//! Incremental generation

use super::{CommandResult, execute};
use convenient_codegen::{CodegenConfig, FsBuildHost, RunMode};

/// Regenerate inputs changed since the last successful run
///
/// With `full`, recorded fingerprints are dropped first so every input is
/// handed to the generator.
pub fn generate(config: CodegenConfig, full: bool) -> CommandResult {
    println!("🔧 Generating code in {}", config.source_dir());
    let mut host = FsBuildHost::open(&config.state_dir)?;
    if full {
        host.forget_fingerprints();
    }
    execute(config, host, RunMode::Generate)
}
