//! Recorded state inspection

use super::CommandResult;
use convenient_codegen::{BuildHost, CodegenConfig, FsBuildHost, MARKER_KEY};
use std::path::Path;

/// Show the last reported error, stored problems and fingerprint counts
pub fn status(config: CodegenConfig) -> CommandResult {
    println!("ℹ️  Genzel Status");
    println!();

    if !config.state_dir.exists() {
        println!("No state found at: {}", config.state_dir.display());
        println!();
        println!("Run 'genzel generate' to create it.");
        return Ok(());
    }

    let host = FsBuildHost::open(&config.state_dir)?;
    let state = host.state();

    println!("State directory: {}", config.state_dir.display());
    match state.last_run {
        Some(last_run) => println!(
            "Last run:        {}",
            last_run
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("Last run:        never"),
    }
    println!();

    println!("Fingerprints:");
    for root in [config.source_dir(), config.test_source_dir()] {
        if root.is_empty() {
            continue;
        }
        println!("  {:<40} {} files", root, host.tracked_files(Path::new(root)));
    }
    println!();

    match host.marker(MARKER_KEY) {
        Some(file) => println!("❌ Last error in {}", file.display()),
        None => println!("✅ No outstanding generator error"),
    }
    if !state.messages.is_empty() {
        println!();
        println!("Problems ({}):", state.messages.len());
        for message in &state.messages {
            println!(
                "  [{}] {}:{}: {}",
                message.severity,
                message.file.display(),
                message.line,
                message.message
            );
        }
    }

    Ok(())
}
