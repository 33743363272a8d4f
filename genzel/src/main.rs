//! Genzel - incremental code generation for source trees
//!
//! Runs an external bean generator over the source roots of a project:
//! 1. Detect which inputs changed since the last successful run
//! 2. Invoke the generator on exactly those inputs
//! 3. Record generator errors as located problems
//! 4. Remember fingerprints so the next run stays incremental

mod commands;

use clap::Parser;
use commands::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "genzel=debug,convenient_codegen=debug"
    } else {
        "genzel=info,convenient_codegen=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let result = match &cli.command {
        Commands::Generate { full } => commands::load_config(&cli)
            .and_then(|config| commands::generate::generate(config, *full)),
        Commands::Validate => {
            commands::load_config(&cli).and_then(commands::validate::validate)
        }
        Commands::Status => commands::load_config(&cli).and_then(commands::status::status),
        Commands::Clean => commands::load_config(&cli).and_then(commands::clean::clean),
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
