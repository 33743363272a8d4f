//! Genzel command-line interface
//!
//! - `generate`: Regenerate changed inputs
//! - `validate`: Report inputs whose generated code is out of date
//! - `status`: Show recorded problems and fingerprints
//! - `clean`: Forget all recorded state

use clap::{Args, Parser, Subcommand};
use convenient_codegen::{
    CodegenConfig, CodegenRunner, DEFAULT_CONFIG_FILE, FsBuildHost, RunMode, RunResult,
    RunStatus, ToolResolver,
};
use std::path::PathBuf;
use tracing::{debug, info};

pub mod clean;
pub mod generate;
pub mod status;
pub mod validate;

/// Result type shared by all commands
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Genzel - incremental code generation
#[derive(Parser, Debug)]
#[command(name = "genzel")]
#[command(about = "Incremental code generation for source trees")]
#[command(version)]
pub struct Cli {
    /// Project root; relative paths in the configuration resolve against it
    #[arg(short = 'C', long, global = true, default_value = ".", env = "GENZEL_PROJECT_DIR")]
    pub project_dir: PathBuf,

    /// Configuration file, relative to the project root
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE, env = "GENZEL_CONFIG")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Regenerate inputs changed since the last run
    Generate {
        /// Forget fingerprints and regenerate everything
        #[arg(long)]
        full: bool,
    },

    /// Check whether generated code is up to date without writing
    Validate,

    /// Show the last error and stored problems
    Status,

    /// Drop fingerprints, markers and problems
    Clean,
}

/// Configuration values that can be overridden per invocation
#[derive(Args, Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    /// Skip code generation entirely
    #[arg(long, global = true, env = "GENZEL_SKIP")]
    pub skip: bool,

    /// Only warn when validation finds out-of-date files
    #[arg(long, global = true, env = "GENZEL_NO_STOP_ON_ERROR")]
    pub no_stop_on_error: bool,

    /// Indentation style passed to the generator
    #[arg(long, global = true, env = "GENZEL_INDENT")]
    pub indent: Option<String>,

    /// Naming prefix passed to the generator
    #[arg(long, global = true, env = "GENZEL_PREFIX")]
    pub prefix: Option<String>,

    /// Generator verbosity (0-3)
    #[arg(
        long,
        global = true,
        env = "GENZEL_VERBOSE_LEVEL",
        value_parser = clap::value_parser!(u8).range(0..=3)
    )]
    pub verbose_level: Option<u8>,
}

impl Overrides {
    /// Apply the overrides on top of file configuration
    pub fn apply(&self, mut config: CodegenConfig) -> CodegenConfig {
        if self.skip {
            config.skip = true;
        }
        if self.no_stop_on_error {
            config.stop_on_error = false;
        }
        if let Some(indent) = &self.indent {
            config.indent = Some(indent.clone());
        }
        if let Some(prefix) = &self.prefix {
            config.prefix = Some(prefix.clone());
        }
        if let Some(level) = self.verbose_level {
            config.verbose = Some(level);
        }
        config
    }
}

/// Load the project configuration, falling back to defaults when the file is absent
pub fn load_config(cli: &Cli) -> CommandResult<CodegenConfig> {
    let path = cli.project_dir.join(&cli.config);
    let config = if path.exists() {
        info!("Loading configuration from {}", path.display());
        CodegenConfig::load(&path)?
    } else {
        debug!("No configuration at {}, using defaults", path.display());
        CodegenConfig::default()
    };
    Ok(cli.overrides.apply(config).rooted_at(&cli.project_dir))
}

/// Run the generator in `mode` against the filesystem host and persist its state
pub(crate) fn execute(config: CodegenConfig, mut host: FsBuildHost, mode: RunMode) -> CommandResult {
    let resolver = ToolResolver::new(
        config.generator.program.clone(),
        config.generator.search_path.clone(),
    );
    let Some(runner) = CodegenRunner::compose(config, &resolver)? else {
        println!(
            "⏭️  {} not found on the generator search path, nothing to do",
            resolver.program()
        );
        return Ok(());
    };

    let result = runner.run(mode, &mut host)?;

    // only a clean generation makes the current inputs the new baseline
    if mode == RunMode::Generate && !runner.config().skip && !result.is_failure() {
        let roots = runner.roots();
        host.commit_roots(roots.iter().map(|root| root.dir.as_path()), runner.include())?;
    }
    host.save()?;

    print_result(&result, mode);
    if result.is_failure() {
        return Err(failure_message(&result.status).into());
    }
    Ok(())
}

fn print_result(result: &RunResult, mode: RunMode) {
    println!();
    for line in summary_lines(result, mode) {
        println!("{}", line);
    }
}

/// Summary of a finished run
///
/// Tool and config errors contribute only their diagnostics; the error
/// itself is printed once by `main`.
fn summary_lines(result: &RunResult, mode: RunMode) -> Vec<String> {
    let mut lines = Vec::new();
    match &result.status {
        RunStatus::Success => {
            lines.push(format!(
                "✅ Code {} completed: {} changed files",
                mode, result.changed_count
            ));
            for file in &result.changed_files {
                lines.push(format!("  • {}", file.display()));
            }
        }
        RunStatus::ValidationFailed { count, files } => {
            lines.push(format!("⚠️  {} files need to be re-generated", count));
            for file in files.iter().flatten() {
                lines.push(format!("  • {}", file.display()));
            }
            lines.push(String::new());
            lines.push("💡 Run 'genzel generate' to update them".to_string());
        }
        RunStatus::ToolError(_) | RunStatus::ConfigError(_) => {}
    }
    for diagnostic in &result.diagnostics {
        lines.push(format!(
            "  {}:{}: {}",
            diagnostic.file.display(),
            diagnostic.host_line(),
            diagnostic.message
        ));
    }
    lines
}

fn failure_message(status: &RunStatus) -> String {
    match status {
        RunStatus::Success => "Code generation succeeded".to_string(),
        RunStatus::ValidationFailed { count, .. } => {
            format!("Generated code is out of date in {} files", count)
        }
        RunStatus::ToolError(message) | RunStatus::ConfigError(message) => message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convenient_codegen::Diagnostic;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("genzel").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_subcommands() {
        assert_eq!(parse(&["generate"]).command, Commands::Generate { full: false });
        assert_eq!(parse(&["generate", "--full"]).command, Commands::Generate { full: true });
        assert_eq!(parse(&["validate"]).command, Commands::Validate);
        assert_eq!(parse(&["status"]).command, Commands::Status);
        assert_eq!(parse(&["clean"]).command, Commands::Clean);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["validate", "--no-stop-on-error", "--indent", "2", "-v"]);
        assert!(cli.verbose);
        assert!(cli.overrides.no_stop_on_error);
        assert_eq!(cli.overrides.indent.as_deref(), Some("2"));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn verbose_level_is_bounded() {
        assert_eq!(parse(&["generate", "--verbose-level", "3"]).overrides.verbose_level, Some(3));
        assert!(Cli::try_parse_from(["genzel", "generate", "--verbose-level", "4"]).is_err());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("genzel.yml"),
            "source_dir: src\nindent: tab\nprefix: f\nstop_on_error: true\n",
        )
        .unwrap();
        let project = temp.path().to_string_lossy().into_owned();
        let cli = parse(&["-C", project.as_str(), "generate", "--prefix", "m_", "--no-stop-on-error"]);

        let config = load_config(&cli).unwrap();
        assert_eq!(config.source_dir(), temp.path().join("src").to_string_lossy());
        assert_eq!(config.indent.as_deref(), Some("tab"));
        assert_eq!(config.prefix.as_deref(), Some("m_"));
        assert!(!config.stop_on_error);
        assert_eq!(config.state_dir, temp.path().join(".genzel"));
    }

    #[test]
    fn missing_config_file_means_defaults() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().to_string_lossy().into_owned();
        let config = load_config(&parse(&["-C", project.as_str(), "status"])).unwrap();
        assert_eq!(
            config,
            CodegenConfig::default().rooted_at(Path::new(&project))
        );
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("genzel.yml"), "skip: [oops").unwrap();
        let project = temp.path().to_string_lossy().into_owned();
        assert!(load_config(&parse(&["-C", project.as_str(), "generate"])).is_err());
    }

    #[test]
    fn missing_generator_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let config = CodegenConfig::default().rooted_at(temp.path());
        let host = FsBuildHost::open(&config.state_dir).unwrap();
        execute(config, host, RunMode::Generate).unwrap();
    }

    #[test]
    fn tool_error_summary_leaves_the_message_to_main() {
        let status = RunStatus::ToolError(
            "Error while running code generator: Error in bean: /p/A.java".to_string(),
        );
        let result = RunResult::failed(
            status.clone(),
            Diagnostic {
                file: PathBuf::from("/p/A.java"),
                line: 4,
                message: "bad".to_string(),
            },
        );

        let lines = summary_lines(&result, RunMode::Generate);
        assert_eq!(lines, vec!["  /p/A.java:5: bad".to_string()]);
        assert!(!lines.iter().any(|line| line.contains(&failure_message(&status))));
    }

    #[test]
    fn success_summary_lists_changed_files() {
        let mut result = RunResult::success(1);
        result.changed_files = vec![PathBuf::from("/p/A.java")];
        assert_eq!(
            summary_lines(&result, RunMode::Generate),
            vec![
                "✅ Code generator completed: 1 changed files".to_string(),
                "  • /p/A.java".to_string()
            ]
        );
    }

    #[test]
    fn failure_messages_name_the_problem() {
        assert_eq!(
            failure_message(&RunStatus::ValidationFailed {
                count: 2,
                files: None
            }),
            "Generated code is out of date in 2 files"
        );
        assert_eq!(
            failure_message(&RunStatus::ConfigError("Source directory must be specified".into())),
            "Source directory must be specified"
        );
    }
}
