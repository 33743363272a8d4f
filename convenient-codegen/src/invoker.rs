//! Generator invocation through a closed capability interface
//!
//! Two historical generator versions exist: one reports the files it
//! regenerated, the older one only how many. A backend advertises which
//! entry points it implements and [`ToolInvoker::resolve`] picks one once,
//! preferring the listing entry point.

use crate::error::{CodegenError, CodegenResult, ToolFailure};
use crate::request::GenerationRequest;
use std::path::PathBuf;
use tracing::debug;

/// Result of one generator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The generator reported only a number of changed files
    CountOnly(usize),
    /// The generator reported changed files; `None` means the whole base directory
    FileList(Vec<Option<PathBuf>>),
}

impl GenerationOutcome {
    /// Number of changed files reported
    pub fn len(&self) -> usize {
        match self {
            GenerationOutcome::CountOnly(count) => *count,
            GenerationOutcome::FileList(files) => files.len(),
        }
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entry points a backend implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// `process_files` returns the changed files
    pub listing: bool,
    /// `process` returns the number of changed files
    pub counting: bool,
}

/// Entry point selected for a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// Use [`Generator::process_files`]
    Listing,
    /// Use [`Generator::process`]
    Counting,
}

impl EntryPoint {
    /// Pick the preferred supported entry point
    pub fn select(capabilities: Capabilities) -> Option<Self> {
        if capabilities.listing {
            Some(EntryPoint::Listing)
        } else if capabilities.counting {
            Some(EntryPoint::Counting)
        } else {
            None
        }
    }
}

/// A configured generator, ready to run once
pub trait Generator {
    /// Generate and return the changed files
    fn process_files(&mut self) -> Result<Vec<Option<PathBuf>>, ToolFailure> {
        Err(ToolFailure::unsupported("process_files"))
    }

    /// Generate and return the number of changed files
    fn process(&mut self) -> Result<usize, ToolFailure> {
        Err(ToolFailure::unsupported("process"))
    }
}

/// A generator version that can be configured from command-line arguments
pub trait GeneratorBackend {
    /// Name used in log messages
    fn name(&self) -> &str;

    /// Entry points this version implements
    fn capabilities(&self) -> Capabilities;

    /// Configure a generator; an error means the arguments were rejected
    fn create_from_args(&self, args: &[String]) -> Result<Box<dyn Generator>, ToolFailure>;
}

/// Invokes a backend through its resolved entry point
pub struct ToolInvoker {
    backend: Box<dyn GeneratorBackend>,
    entry_point: EntryPoint,
}

impl std::fmt::Debug for ToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvoker")
            .field("backend", &self.backend.name())
            .field("entry_point", &self.entry_point)
            .finish()
    }
}

impl ToolInvoker {
    /// Select the entry point for `backend`
    ///
    /// # Errors
    ///
    /// Returns `CodegenError::Config` when the backend implements neither entry point.
    pub fn resolve(backend: Box<dyn GeneratorBackend>) -> CodegenResult<Self> {
        let entry_point = EntryPoint::select(backend.capabilities()).ok_or_else(|| {
            CodegenError::Config(format!(
                "Unable to find a supported entry point on {}",
                backend.name()
            ))
        })?;
        debug!("Using {:?} entry point of {}", entry_point, backend.name());
        Ok(Self {
            backend,
            entry_point,
        })
    }

    /// Entry point in use
    pub fn entry_point(&self) -> EntryPoint {
        self.entry_point
    }

    /// Configure the generator with `request` and run it
    ///
    /// # Errors
    ///
    /// `CodegenError::Config` when the arguments are rejected,
    /// `CodegenError::Tool` when generation itself fails.
    pub fn invoke(&self, request: &GenerationRequest) -> CodegenResult<GenerationOutcome> {
        let args = request.args();
        debug!("Invoking {} with {:?}", self.backend.name(), args);
        let mut generator = self.backend.create_from_args(&args).map_err(|failure| {
            CodegenError::Config(format!(
                "Invalid code generator configuration: {}",
                failure.message
            ))
        })?;
        let outcome = match self.entry_point {
            EntryPoint::Listing => GenerationOutcome::FileList(generator.process_files()?),
            EntryPoint::Counting => GenerationOutcome::CountOnly(generator.process()?),
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodegenConfig;
    use crate::request::{RequestFlags, RunMode};

    struct Legacy;

    impl Generator for Legacy {
        fn process(&mut self) -> Result<usize, ToolFailure> {
            Ok(3)
        }
    }

    struct Current;

    impl Generator for Current {
        fn process_files(&mut self) -> Result<Vec<Option<PathBuf>>, ToolFailure> {
            Ok(vec![Some(PathBuf::from("A.java"))])
        }

        fn process(&mut self) -> Result<usize, ToolFailure> {
            Ok(1)
        }
    }

    struct Broken;

    impl Generator for Broken {
        fn process_files(&mut self) -> Result<Vec<Option<PathBuf>>, ToolFailure> {
            Err(ToolFailure::new("Error in bean: A.java, Line: 4, Message: bad"))
        }
    }

    struct Backend {
        capabilities: Capabilities,
        reject: bool,
        make: fn() -> Box<dyn Generator>,
    }

    impl GeneratorBackend for Backend {
        fn name(&self) -> &str {
            "test-backend"
        }

        fn capabilities(&self) -> Capabilities {
            self.capabilities
        }

        fn create_from_args(&self, _args: &[String]) -> Result<Box<dyn Generator>, ToolFailure> {
            if self.reject {
                return Err(ToolFailure::new("Unknown flag -bogus"));
            }
            Ok((self.make)())
        }
    }

    fn request() -> GenerationRequest {
        let flags = RequestFlags::from_config(&CodegenConfig::default(), RunMode::Generate);
        GenerationRequest::for_target(&flags, "src")
    }

    const BOTH: Capabilities = Capabilities {
        listing: true,
        counting: true,
    };
    const COUNTING: Capabilities = Capabilities {
        listing: false,
        counting: true,
    };

    #[test]
    fn listing_preferred_over_counting() {
        let invoker = ToolInvoker::resolve(Box::new(Backend {
            capabilities: BOTH,
            reject: false,
            make: || Box::new(Current),
        }))
        .unwrap();
        assert_eq!(invoker.entry_point(), EntryPoint::Listing);
        assert_eq!(
            invoker.invoke(&request()).unwrap(),
            GenerationOutcome::FileList(vec![Some(PathBuf::from("A.java"))])
        );
    }

    #[test]
    fn counting_fallback() {
        let invoker = ToolInvoker::resolve(Box::new(Backend {
            capabilities: COUNTING,
            reject: false,
            make: || Box::new(Legacy),
        }))
        .unwrap();
        assert_eq!(invoker.entry_point(), EntryPoint::Counting);
        assert_eq!(invoker.invoke(&request()).unwrap(), GenerationOutcome::CountOnly(3));
    }

    #[test]
    fn no_entry_point_is_config_error() {
        let err = ToolInvoker::resolve(Box::new(Backend {
            capabilities: Capabilities::default(),
            reject: false,
            make: || Box::new(Legacy),
        }))
        .unwrap_err();
        assert!(matches!(err, CodegenError::Config(_)));
    }

    #[test]
    fn rejected_arguments_are_config_error() {
        let invoker = ToolInvoker::resolve(Box::new(Backend {
            capabilities: BOTH,
            reject: true,
            make: || Box::new(Current),
        }))
        .unwrap();
        match invoker.invoke(&request()).unwrap_err() {
            CodegenError::Config(message) => {
                assert_eq!(message, "Invalid code generator configuration: Unknown flag -bogus");
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn generation_failure_is_tool_error() {
        let invoker = ToolInvoker::resolve(Box::new(Backend {
            capabilities: BOTH,
            reject: false,
            make: || Box::new(Broken),
        }))
        .unwrap();
        match invoker.invoke(&request()).unwrap_err() {
            CodegenError::Tool(failure) => assert!(failure.message.starts_with("Error in bean: ")),
            other => panic!("expected tool error, got {other:?}"),
        }
    }

    #[test]
    fn count_only_and_sentinel_list_have_same_length() {
        let sentinels = GenerationOutcome::FileList(vec![None, None, None]);
        assert_eq!(sentinels.len(), GenerationOutcome::CountOnly(3).len());
        assert!(GenerationOutcome::FileList(vec![]).is_empty());
    }
}
