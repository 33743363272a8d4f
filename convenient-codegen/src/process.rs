//! External generator run as a child process
//!
//! One adapter per generator protocol version:
//! - [`ToolProtocol::Listing`] prints `changed: <path>` per regenerated file,
//!   or `changed: *` when it cannot enumerate them
//! - [`ToolProtocol::Counting`] prints `count: <n>`
//!
//! On failure the generator exits non-zero; the first stderr line is the
//! message and `Caused by: ` lines carry the wrapped causes.

use crate::config::ToolProtocol;
use crate::error::ToolFailure;
use crate::invoker::{Capabilities, Generator, GeneratorBackend};
use crate::request::{FLAG_NO_WRITE, FLAG_RECURSE};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const CHANGED_PREFIX: &str = "changed: ";
const COUNT_PREFIX: &str = "count: ";
const CAUSE_PREFIX: &str = "Caused by: ";
const WHOLE_DIRECTORY: &str = "*";

const VALUE_FLAGS: [&str; 4] = ["-indent=", "-prefix=", "-config=", "-verbose="];

/// Generator backend spawning an external program
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    program: PathBuf,
    protocol: ToolProtocol,
    name: String,
}

impl ProcessBackend {
    /// Backend running `program`, which speaks `protocol`
    pub fn new(program: impl Into<PathBuf>, protocol: ToolProtocol) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self {
            program,
            protocol,
            name,
        }
    }
}

impl GeneratorBackend for ProcessBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        match self.protocol {
            ToolProtocol::Listing => Capabilities {
                listing: true,
                counting: true,
            },
            ToolProtocol::Counting => Capabilities {
                listing: false,
                counting: true,
            },
        }
    }

    fn create_from_args(&self, args: &[String]) -> Result<Box<dyn Generator>, ToolFailure> {
        validate_args(args)?;
        Ok(Box::new(ProcessGenerator {
            program: self.program.clone(),
            args: args.to_vec(),
            protocol: self.protocol,
        }))
    }
}

/// Check the argument grammar: flags first, then existing target paths
fn validate_args(args: &[String]) -> Result<(), ToolFailure> {
    let first_target = args
        .iter()
        .position(|arg| !arg.starts_with('-'))
        .ok_or_else(|| ToolFailure::new("No source directory or file specified"))?;

    for flag in &args[..first_target] {
        if flag == FLAG_RECURSE || flag == FLAG_NO_WRITE {
            continue;
        }
        let Some(prefix) = VALUE_FLAGS.iter().find(|prefix| flag.starts_with(**prefix)) else {
            return Err(ToolFailure::new(format!("Unknown option: {flag}")));
        };
        let value = &flag[prefix.len()..];
        if value.is_empty() {
            return Err(ToolFailure::new(format!("Missing value for option: {flag}")));
        }
        if *prefix == "-verbose=" && !matches!(value.parse::<u8>(), Ok(0..=3)) {
            return Err(ToolFailure::new(format!(
                "Verbosity must be between 0 and 3: {flag}"
            )));
        }
    }

    for target in &args[first_target..] {
        if target.starts_with('-') {
            return Err(ToolFailure::new(format!(
                "Option must precede source paths: {target}"
            )));
        }
        if !Path::new(target).exists() {
            return Err(ToolFailure::new(format!("Source path does not exist: {target}")));
        }
    }
    Ok(())
}

struct ProcessGenerator {
    program: PathBuf,
    args: Vec<String>,
    protocol: ToolProtocol,
}

impl ProcessGenerator {
    fn run(&self) -> Result<String, ToolFailure> {
        debug!("Running {} {:?}", self.program.display(), self.args);
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| {
                ToolFailure::new(format!("Unable to run {}: {e}", self.program.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(parse_failure(&stderr).unwrap_or_else(|| {
                ToolFailure::new(format!(
                    "{} exited with {}",
                    self.program.display(),
                    output.status
                ))
            }));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Generator for ProcessGenerator {
    fn process_files(&mut self) -> Result<Vec<Option<PathBuf>>, ToolFailure> {
        if self.protocol != ToolProtocol::Listing {
            return Err(ToolFailure::unsupported("process_files"));
        }
        Ok(parse_listing(&self.run()?))
    }

    fn process(&mut self) -> Result<usize, ToolFailure> {
        match self.protocol {
            ToolProtocol::Listing => self.process_files().map(|files| files.len()),
            ToolProtocol::Counting => parse_count(&self.run()?),
        }
    }
}

fn parse_listing(stdout: &str) -> Vec<Option<PathBuf>> {
    stdout
        .lines()
        .filter_map(|line| line.trim_end().strip_prefix(CHANGED_PREFIX))
        .map(|path| match path.trim() {
            WHOLE_DIRECTORY => None,
            path => Some(PathBuf::from(path)),
        })
        .collect()
}

fn parse_count(stdout: &str) -> Result<usize, ToolFailure> {
    let value = stdout
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix(COUNT_PREFIX))
        .ok_or_else(|| ToolFailure::new("Generator did not report a change count"))?;
    value
        .trim()
        .parse()
        .map_err(|_| ToolFailure::new(format!("Invalid change count: {value}")))
}

fn parse_failure(stderr: &str) -> Option<ToolFailure> {
    let mut lines = stderr.lines().map(str::trim).filter(|line| !line.is_empty());
    let mut failure = ToolFailure::new(lines.next()?);
    for line in lines {
        if let Some(cause) = line.strip_prefix(CAUSE_PREFIX) {
            failure = failure.caused_by(cause);
        }
    }
    Some(failure)
}
