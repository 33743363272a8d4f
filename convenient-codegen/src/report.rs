//! Reporting generation results to the host

use crate::error::{CodegenError, CodegenResult};
use crate::host::BuildHost;
use crate::invoker::GenerationOutcome;
use crate::request::RunMode;
use crate::translate::Diagnostic;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Final status of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Generation succeeded, or validation found drift but was told not to fail
    Success,
    /// Validation found files needing regeneration
    ValidationFailed {
        /// Number of files needing regeneration
        count: usize,
        /// The files, when the generator listed them
        files: Option<Vec<PathBuf>>,
    },
    /// The generator failed
    ToolError(String),
    /// The arguments or the generator setup were invalid
    ConfigError(String),
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Number of changed (or drifted) files
    pub changed_count: usize,
    /// Final status
    pub status: RunStatus,
    /// Concrete changed files reported by the generator
    pub changed_files: Vec<PathBuf>,
    /// Problems recorded on the host during the run
    pub diagnostics: Vec<Diagnostic>,
}

impl RunResult {
    /// Successful run with `changed_count` changes
    pub fn success(changed_count: usize) -> Self {
        Self {
            changed_count,
            status: RunStatus::Success,
            changed_files: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Failed run carrying `status` and the diagnostic recorded for it
    pub fn failed(status: RunStatus, diagnostic: Diagnostic) -> Self {
        Self {
            changed_count: 0,
            status,
            changed_files: Vec::new(),
            diagnostics: vec![diagnostic],
        }
    }

    /// Whether the build step must fail
    pub fn is_failure(&self) -> bool {
        !matches!(self.status, RunStatus::Success)
    }
}

/// Where the reporter refreshes and cleans up
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Source root the generator ran on
    pub base_dir: PathBuf,
    /// Compiled output for `base_dir`
    pub classes_dir: PathBuf,
    /// Extension of generator inputs
    pub source_extension: String,
    /// Extension of compiled artifacts
    pub compiled_extension: String,
    /// Delete and refresh compiled artifacts of changed sources
    pub refresh_compiled_artifacts: bool,
}

impl ReportOptions {
    /// Compiled artifact for a changed source under `base_dir`
    pub fn compiled_artifact(&self, source: &Path) -> Option<PathBuf> {
        let relative = source.strip_prefix(&self.base_dir).ok()?;
        if relative.extension()? != self.source_extension.as_str() {
            return None;
        }
        Some(
            self.classes_dir
                .join(relative)
                .with_extension(&self.compiled_extension),
        )
    }
}

/// What one generator call changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reported {
    /// Number of changes as reported by the generator
    pub count: usize,
    /// Concrete changed files, deduplicated in first-seen order
    pub files: Vec<PathBuf>,
}

/// Applies generation outcomes to the host
#[derive(Debug, Default)]
pub struct Reporter;

impl Reporter {
    /// Refresh what the generator changed
    ///
    /// # Errors
    ///
    /// Returns `CodegenError::Io` when a compiled artifact cannot be deleted.
    pub fn report(
        &self,
        outcome: &GenerationOutcome,
        options: &ReportOptions,
        host: &mut dyn BuildHost,
    ) -> CodegenResult<Reported> {
        let (whole_dir, reported) = Self::tally(outcome, &options.base_dir);
        if reported.count == 0 {
            debug!("Nothing changed in {}", options.base_dir.display());
            return Ok(reported);
        }

        if whole_dir {
            debug!("Refreshing directory {}", options.base_dir.display());
            host.refresh(&options.base_dir);
        }
        for file in &reported.files {
            debug!("Refreshing {}", file.display());
            host.refresh(file);
            if options.refresh_compiled_artifacts {
                Self::drop_compiled_artifact(file, options, host)?;
            }
        }

        Ok(reported)
    }

    /// Count and normalize an outcome without touching the host
    ///
    /// Relative paths are resolved against `base_dir`. The flag is set when
    /// the whole directory must be treated as changed.
    pub fn tally(outcome: &GenerationOutcome, base_dir: &Path) -> (bool, Reported) {
        let count = outcome.len();
        let (whole_dir, files) = match outcome {
            GenerationOutcome::CountOnly(_) => (true, Vec::new()),
            GenerationOutcome::FileList(entries) => {
                let mut seen = HashSet::new();
                let mut files = Vec::new();
                let mut whole_dir = false;
                for entry in entries {
                    match entry {
                        None => whole_dir = true,
                        Some(file) => {
                            let file = if file.is_absolute() {
                                file.clone()
                            } else {
                                base_dir.join(file)
                            };
                            if seen.insert(file.clone()) {
                                files.push(file);
                            }
                        }
                    }
                }
                (whole_dir, files)
            }
        };
        (count > 0 && whole_dir, Reported { count, files })
    }

    fn drop_compiled_artifact(
        source: &Path,
        options: &ReportOptions,
        host: &mut dyn BuildHost,
    ) -> CodegenResult<()> {
        let Some(artifact) = options.compiled_artifact(source) else {
            return Ok(());
        };
        match fs::remove_file(&artifact) {
            Ok(()) => debug!("Deleted stale artifact {}", artifact.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(CodegenError::io(artifact, e)),
        }
        host.refresh(&artifact);
        Ok(())
    }

    /// Turn accumulated changes into the run result for `mode`
    pub fn finish(
        &self,
        total: usize,
        files: Vec<PathBuf>,
        mode: RunMode,
        stop_on_error: bool,
    ) -> RunResult {
        let mut result = RunResult::success(total);
        result.changed_files = files;
        match mode {
            RunMode::Generate => {
                info!("Code generator completed, {} changed files", total);
            }
            RunMode::Validate if total == 0 => {
                info!("Code validator completed");
            }
            RunMode::Validate if stop_on_error => {
                warn!("Some generated code needs to be re-generated ({} files)", total);
                let files = (!result.changed_files.is_empty()).then(|| result.changed_files.clone());
                result.status = RunStatus::ValidationFailed {
                    count: total,
                    files,
                };
            }
            RunMode::Validate => {
                warn!("*** Code validator found {} files in need of generation ***", total);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Severity;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingHost {
        refreshed: Vec<PathBuf>,
        markers: BTreeMap<String, PathBuf>,
    }

    impl BuildHost for RecordingHost {
        fn refresh(&mut self, path: &Path) {
            self.refreshed.push(path.to_path_buf());
        }

        fn remove_messages(&mut self, _path: &Path) {}

        fn add_message(&mut self, _file: &Path, _line: u32, _message: &str, _severity: Severity) {}

        fn marker(&self, key: &str) -> Option<PathBuf> {
            self.markers.get(key).cloned()
        }

        fn set_marker(&mut self, key: &str, value: Option<PathBuf>) {
            match value {
                Some(value) => {
                    let _ = self.markers.insert(key.to_string(), value);
                }
                None => {
                    let _ = self.markers.remove(key);
                }
            }
        }
    }

    fn options(base: &Path) -> ReportOptions {
        ReportOptions {
            base_dir: base.join("src"),
            classes_dir: base.join("classes"),
            source_extension: "java".to_string(),
            compiled_extension: "class".to_string(),
            refresh_compiled_artifacts: false,
        }
    }

    #[test]
    fn nothing_changed_refreshes_nothing() {
        let mut host = RecordingHost::default();
        let options = options(Path::new("/p"));
        for outcome in [GenerationOutcome::CountOnly(0), GenerationOutcome::FileList(vec![])] {
            let reported = Reporter.report(&outcome, &options, &mut host).unwrap();
            assert_eq!(reported, Reported::default());
        }
        assert!(host.refreshed.is_empty());
    }

    #[test]
    fn sentinel_refreshes_base_dir_once() {
        let mut host = RecordingHost::default();
        let options = options(Path::new("/p"));
        let reported = Reporter
            .report(&GenerationOutcome::FileList(vec![None]), &options, &mut host)
            .unwrap();
        assert_eq!(reported.count, 1);
        assert_eq!(host.refreshed, vec![PathBuf::from("/p/src")]);
    }

    #[test]
    fn count_only_matches_sentinel_list() {
        let options = options(Path::new("/p"));
        let mut host = RecordingHost::default();
        let counted = Reporter
            .report(&GenerationOutcome::CountOnly(3), &options, &mut host)
            .unwrap();
        let listed = Reporter
            .report(&GenerationOutcome::FileList(vec![None, None, None]), &options, &mut host)
            .unwrap();
        assert_eq!(counted.count, listed.count);
        let counted = Reporter.finish(counted.count, counted.files, RunMode::Generate, true);
        let listed = Reporter.finish(listed.count, listed.files, RunMode::Generate, true);
        assert_eq!(counted.changed_count, listed.changed_count);
    }

    #[test]
    fn concrete_files_refreshed_once_in_first_seen_order() {
        let mut host = RecordingHost::default();
        let options = options(Path::new("/p"));
        let outcome = GenerationOutcome::FileList(vec![
            Some(PathBuf::from("b/B.java")),
            Some(PathBuf::from("/p/src/a/A.java")),
            Some(PathBuf::from("b/B.java")),
        ]);
        let reported = Reporter.report(&outcome, &options, &mut host).unwrap();
        assert_eq!(reported.count, 3);
        assert_eq!(
            reported.files,
            vec![PathBuf::from("/p/src/b/B.java"), PathBuf::from("/p/src/a/A.java")]
        );
        assert_eq!(host.refreshed, reported.files);
    }

    #[test]
    fn compiled_artifacts_untouched_unless_enabled() {
        let temp = TempDir::new().unwrap();
        let options = options(temp.path());
        let artifact = temp.path().join("classes/org/Bean.class");
        fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        fs::write(&artifact, b"cafebabe").unwrap();

        let outcome = GenerationOutcome::FileList(vec![Some(PathBuf::from("org/Bean.java"))]);
        let mut host = RecordingHost::default();
        let _ = Reporter.report(&outcome, &options, &mut host).unwrap();
        assert!(artifact.exists());

        let enabled = ReportOptions {
            refresh_compiled_artifacts: true,
            ..options
        };
        let mut host = RecordingHost::default();
        let _ = Reporter.report(&outcome, &enabled, &mut host).unwrap();
        assert!(!artifact.exists());
        assert_eq!(
            host.refreshed,
            vec![temp.path().join("src/org/Bean.java"), artifact]
        );
    }

    #[test]
    fn undeletable_artifact_is_a_hard_failure() {
        let temp = TempDir::new().unwrap();
        let enabled = ReportOptions {
            refresh_compiled_artifacts: true,
            ..options(temp.path())
        };
        // a non-empty directory where the class file should be cannot be unlinked
        let artifact = temp.path().join("classes/org/Bean.class");
        fs::create_dir_all(&artifact).unwrap();
        fs::write(artifact.join("inner"), b"x").unwrap();

        let outcome = GenerationOutcome::FileList(vec![Some(PathBuf::from("org/Bean.java"))]);
        let mut host = RecordingHost::default();
        match Reporter.report(&outcome, &enabled, &mut host).unwrap_err() {
            CodegenError::Io { path, .. } => assert_eq!(path, artifact),
            other => panic!("expected io error, got {other:?}"),
        }
        assert!(artifact.exists());
    }

    #[test]
    fn compiled_artifact_only_for_sources_under_base() {
        let options = options(Path::new("/p"));
        assert_eq!(
            options.compiled_artifact(Path::new("/p/src/x/Y.java")),
            Some(PathBuf::from("/p/classes/x/Y.class"))
        );
        assert_eq!(options.compiled_artifact(Path::new("/elsewhere/Y.java")), None);
        assert_eq!(options.compiled_artifact(Path::new("/p/src/x/Y.txt")), None);
    }

    #[test]
    fn validation_failure_depends_on_stop_on_error() {
        let files = vec![PathBuf::from("A.java")];
        let hard = Reporter.finish(2, files.clone(), RunMode::Validate, true);
        assert!(hard.is_failure());
        assert_eq!(
            hard.status,
            RunStatus::ValidationFailed {
                count: 2,
                files: Some(files.clone())
            }
        );

        let soft = Reporter.finish(2, files, RunMode::Validate, false);
        assert_eq!(soft.status, RunStatus::Success);
        assert_eq!(soft.changed_count, 2);
    }

    #[test]
    fn clean_validation_succeeds() {
        let result = Reporter.finish(0, Vec::new(), RunMode::Validate, true);
        assert!(!result.is_failure());
        assert_eq!(result.changed_count, 0);
    }
}
