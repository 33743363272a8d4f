//! Incremental code-generation runner
//!
//! Glue between a host build tool and an external code generator:
//!
//! 1. **Detection**: [`detect`] asks the host's [`ChangeOracle`] which
//!    generator inputs changed since the last run
//! 2. **Invocation**: [`ToolInvoker`] configures and runs a
//!    [`GeneratorBackend`] through whichever entry point it supports
//! 3. **Translation**: [`translate`] turns generator failures into a
//!    located [`Diagnostic`]
//! 4. **Reporting**: [`Reporter`] refreshes changed files on the
//!    [`BuildHost`] and decides the final [`RunStatus`]
//!
//! [`CodegenRunner`] drives the whole workflow for the configured source roots.
//!
//! ## Usage
//!
//! ```no_run
//! use convenient_codegen::*;
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CodegenConfig::load("genzel.yml")?;
//! let resolver = ToolResolver::new(
//!     config.generator.program.clone(),
//!     config.generator.search_path.clone(),
//! );
//! let mut host = FsBuildHost::open(&config.state_dir)?;
//!
//! if let Some(runner) = CodegenRunner::compose(config, &resolver)? {
//!     let result = runner.run(RunMode::Generate, &mut host)?;
//!     println!("{} files changed", result.changed_count);
//! }
//! host.save()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

pub mod config;
pub mod detector;
pub mod error;
pub mod fingerprint;
pub mod fs_host;
pub mod host;
pub mod invoker;
pub mod process;
pub mod report;
pub mod request;
pub mod resolver;
pub mod runner;
pub mod translate;

pub use config::{CodegenConfig, DEFAULT_CONFIG_FILE, GeneratorConfig, ToolProtocol};
pub use detector::{ChangeOracle, ChangeSet, IncludePattern, detect};
pub use error::{CodegenError, CodegenResult, ToolFailure};
pub use fingerprint::{FileFingerprint, FingerprintOracle};
pub use fs_host::{FsBuildHost, HostState, StoredMessage};
pub use host::{BuildHost, MARKER_KEY, Severity};
pub use invoker::{
    Capabilities, EntryPoint, GenerationOutcome, Generator, GeneratorBackend, ToolInvoker,
};
pub use process::ProcessBackend;
pub use report::{ReportOptions, Reported, Reporter, RunResult, RunStatus};
pub use request::{GenerationRequest, RequestFlags, RunMode};
pub use resolver::ToolResolver;
pub use runner::{CodegenRunner, SourceRoot};
pub use translate::{Diagnostic, MESSAGE_PATTERN, parse_structured, translate};
