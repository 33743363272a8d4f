//! State cleanup

use super::CommandResult;
use convenient_codegen::{BuildHost, CodegenConfig, FsBuildHost, MARKER_KEY};

/// Forget fingerprints, the error marker and stored problems
///
/// The next `generate` processes every input again.
pub fn clean(config: CodegenConfig) -> CommandResult {
    println!("🧹 Cleaning genzel state...");
    println!();

    if !config.state_dir.exists() {
        println!("Nothing to clean at: {}", config.state_dir.display());
        return Ok(());
    }

    let mut host = FsBuildHost::open(&config.state_dir)?;
    let problems = host.state().messages.len();
    let had_error = host.marker(MARKER_KEY).is_some();
    host.reset();
    host.save()?;

    println!("✅ State cleaned successfully!");
    println!();
    println!("Removed:");
    println!("  Problems:     {}", problems);
    println!("  Error marker: {}", if had_error { "yes" } else { "no" });
    println!("  Fingerprints: all");

    Ok(())
}
