//! The incremental generation workflow
//!
//! Detect → invoke → translate failures → report, once per source root.

use crate::config::CodegenConfig;
use crate::detector::{ChangeSet, IncludePattern, detect};
use crate::error::{CodegenError, CodegenResult, ToolFailure};
use crate::host::{BuildHost, MARKER_KEY, Severity};
use crate::invoker::ToolInvoker;
use crate::process::ProcessBackend;
use crate::report::{ReportOptions, Reporter, RunResult, RunStatus};
use crate::request::{GenerationRequest, RequestFlags, RunMode};
use crate::resolver::ToolResolver;
use crate::translate::translate;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// A source root and where its compiled output lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    /// Generator input directory
    pub dir: PathBuf,
    /// Compiled output for `dir`
    pub classes_dir: PathBuf,
}

/// Runs the generator over the configured source roots
#[derive(Debug)]
pub struct CodegenRunner {
    config: CodegenConfig,
    include: IncludePattern,
    invoker: ToolInvoker,
    reporter: Reporter,
}

impl CodegenRunner {
    /// Runner using an already resolved invoker
    pub fn new(config: CodegenConfig, invoker: ToolInvoker) -> CodegenResult<Self> {
        let include = IncludePattern::new(&config.include)?;
        Ok(Self {
            config,
            include,
            invoker,
            reporter: Reporter,
        })
    }

    /// Runner driving the external generator found by `resolver`
    ///
    /// Returns `Ok(None)` when the generator is not on the search path,
    /// meaning the project does not use it.
    pub fn compose(config: CodegenConfig, resolver: &ToolResolver) -> CodegenResult<Option<Self>> {
        let Some(program) = resolver.resolve() else {
            info!(
                "Skipping as {} is not on the generator search path",
                resolver.program()
            );
            return Ok(None);
        };
        let backend = ProcessBackend::new(program, config.generator.protocol);
        let invoker = ToolInvoker::resolve(Box::new(backend))?;
        Ok(Some(Self::new(config, invoker)?))
    }

    /// Configuration in use
    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    /// Include pattern selecting generator inputs
    pub fn include(&self) -> &IncludePattern {
        &self.include
    }

    /// Configured source roots, main first
    pub fn roots(&self) -> Vec<SourceRoot> {
        let mut roots = vec![SourceRoot {
            dir: PathBuf::from(self.config.source_dir()),
            classes_dir: self.config.classes_dir.clone(),
        }];
        if !self.config.test_source_dir().is_empty() {
            roots.push(SourceRoot {
                dir: PathBuf::from(self.config.test_source_dir()),
                classes_dir: self.config.test_classes_dir.clone(),
            });
        }
        roots
    }

    fn report_options(&self, root: &SourceRoot) -> ReportOptions {
        ReportOptions {
            base_dir: root.dir.clone(),
            classes_dir: root.classes_dir.clone(),
            source_extension: self.config.source_extension.clone(),
            compiled_extension: self.config.compiled_extension.clone(),
            refresh_compiled_artifacts: self.config.refresh_compiled_artifacts,
        }
    }

    /// Run once in `mode` against `host`
    ///
    /// Configuration and generator failures end up in the returned
    /// [`RunResult`]; only I/O and state errors are returned as `Err`.
    pub fn run(&self, mode: RunMode, host: &mut dyn BuildHost) -> CodegenResult<RunResult> {
        if self.config.skip {
            info!("Skipping code {}", mode);
            return Ok(RunResult::success(0));
        }
        if self.config.source_dir().is_empty() {
            let message = "Source directory must be specified".to_string();
            error!("{}", message);
            return Ok(RunResult {
                status: RunStatus::ConfigError(message),
                ..RunResult::success(0)
            });
        }

        // validation always checks every input
        let oracle = match mode {
            RunMode::Generate => host.change_oracle(),
            RunMode::Validate => None,
        };
        let mut pending = Vec::new();
        for root in self.roots() {
            let changes = detect(&root.dir, oracle, &self.include)?;
            pending.push((root, changes));
        }

        if pending.iter().all(|(_, changes)| changes.is_empty()) {
            info!("No files changed");
            return Ok(RunResult::success(0));
        }
        debug!(
            "Files changed: {}",
            pending
                .iter()
                .map(|(root, changes)| format!("{}={}", root.dir.display(), describe(changes)))
                .collect::<Vec<_>>()
                .join(", ")
        );
        info!(
            "Code {} started, directories: {}",
            mode,
            pending
                .iter()
                .map(|(root, _)| root.dir.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        clear_previous_problems(host, &pending);

        let flags = RequestFlags::from_config(&self.config, mode);
        let mut total = 0;
        let mut files = Vec::new();
        for (root, changes) in &pending {
            let Some(target) = changes.target(&root.dir) else {
                continue;
            };
            debug!("Target: {}", target.display());
            let request = GenerationRequest::for_target(&flags, target);

            let outcome = match self.invoker.invoke(&request) {
                Ok(outcome) => outcome,
                Err(CodegenError::Config(message)) => {
                    return Ok(self.config_failure(message, &root.dir, host));
                }
                Err(CodegenError::Tool(failure)) => {
                    return Ok(self.tool_failure(&failure, &root.dir, host));
                }
                Err(other) => return Err(other),
            };

            let reported = match mode {
                RunMode::Generate => {
                    self.reporter
                        .report(&outcome, &self.report_options(root), host)?
                }
                // nothing was written, so there is nothing to refresh
                RunMode::Validate => Reporter::tally(&outcome, &root.dir).1,
            };
            total += reported.count;
            files.extend(reported.files);
        }

        Ok(self
            .reporter
            .finish(total, files, mode, self.config.stop_on_error))
    }

    fn config_failure(&self, message: String, root: &Path, host: &mut dyn BuildHost) -> RunResult {
        error!("{}", message);
        let diagnostic = translate(&ToolFailure::new(message.clone()), root);
        record(host, &diagnostic.file, diagnostic.host_line(), &diagnostic.message);
        RunResult::failed(RunStatus::ConfigError(message), diagnostic)
    }

    fn tool_failure(&self, failure: &ToolFailure, root: &Path, host: &mut dyn BuildHost) -> RunResult {
        let diagnostic = translate(failure, root);
        record(host, &diagnostic.file, diagnostic.host_line(), &diagnostic.message);

        if host.owns_problem_display() {
            warn!(
                "Code generator failed in {}: {}",
                diagnostic.file.display(),
                diagnostic.message
            );
            let mut result = RunResult::success(0);
            result.diagnostics.push(diagnostic);
            return result;
        }

        let message = CodegenError::Tool(failure.clone()).to_string();
        error!("{}", message);
        RunResult::failed(RunStatus::ToolError(message), diagnostic)
    }
}

fn describe(changes: &ChangeSet) -> String {
    match changes {
        ChangeSet::Unknown => "all".to_string(),
        ChangeSet::Empty => "0".to_string(),
        ChangeSet::Paths(paths) => paths.len().to_string(),
    }
}

/// Clear the last reported error and problems on files about to be regenerated
fn clear_previous_problems(host: &mut dyn BuildHost, pending: &[(SourceRoot, ChangeSet)]) {
    if let Some(previous) = host.marker(MARKER_KEY) {
        debug!("Clearing previous problem on {}", previous.display());
        host.remove_messages(&previous);
        host.set_marker(MARKER_KEY, None);
    }
    for (_, changes) in pending {
        for path in changes.paths() {
            host.remove_messages(path);
        }
    }
}

fn record(host: &mut dyn BuildHost, file: &Path, line: u32, message: &str) {
    host.add_message(file, line, message, Severity::Error);
    host.set_marker(MARKER_KEY, Some(file.to_path_buf()));
}
