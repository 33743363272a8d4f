//! Runner configuration loaded from `genzel.yml`

use crate::error::{CodegenError, CodegenResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "genzel.yml";

/// Complete runner configuration
///
/// Every field has a default so a minimal file only names what differs
/// from a conventional Maven-style layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CodegenConfig {
    /// Production source root (required, must not be blank)
    pub source_dir: String,
    /// Test source root (blank disables the test pass)
    pub test_source_dir: String,
    /// Compiled output for production sources
    pub classes_dir: PathBuf,
    /// Compiled output for test sources
    pub test_classes_dir: PathBuf,
    /// Glob selecting generator input files, relative to a source root
    pub include: String,
    /// Indentation style passed as `-indent=`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent: Option<String>,
    /// Naming prefix passed as `-prefix=`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Generator configuration file passed as `-config=`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// Generator verbosity passed as `-verbose=`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<u8>,
    /// Skip the run entirely
    pub skip: bool,
    /// Fail validation when generated code is out of date
    pub stop_on_error: bool,
    /// Delete and refresh compiled artifacts of regenerated sources
    pub refresh_compiled_artifacts: bool,
    /// Extension of generator input files
    pub source_extension: String,
    /// Extension of compiled artifacts
    pub compiled_extension: String,
    /// Directory holding fingerprints, markers and diagnostics
    pub state_dir: PathBuf,
    /// External generator settings
    pub generator: GeneratorConfig,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            source_dir: "src/main/java".to_string(),
            test_source_dir: "src/test/java".to_string(),
            classes_dir: PathBuf::from("target/classes"),
            test_classes_dir: PathBuf::from("target/test-classes"),
            include: "**/*.java".to_string(),
            indent: None,
            prefix: None,
            config: None,
            verbose: None,
            skip: false,
            stop_on_error: true,
            refresh_compiled_artifacts: false,
            source_extension: "java".to_string(),
            compiled_extension: "class".to_string(),
            state_dir: PathBuf::from(".genzel"),
            generator: GeneratorConfig::default(),
        }
    }
}

impl CodegenConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> CodegenResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| CodegenError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> CodegenResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Source root with surrounding whitespace removed
    pub fn source_dir(&self) -> &str {
        self.source_dir.trim()
    }

    /// Test source root with surrounding whitespace removed, may be empty
    pub fn test_source_dir(&self) -> &str {
        self.test_source_dir.trim()
    }

    /// Resolve every relative path against `root`
    #[must_use]
    pub fn rooted_at(mut self, root: &Path) -> Self {
        let join = |value: &str| -> String {
            if value.trim().is_empty() || Path::new(value.trim()).is_absolute() {
                value.trim().to_string()
            } else {
                root.join(value.trim()).to_string_lossy().into_owned()
            }
        };
        self.source_dir = join(&self.source_dir);
        self.test_source_dir = join(&self.test_source_dir);
        self.classes_dir = root.join(&self.classes_dir);
        self.test_classes_dir = root.join(&self.test_classes_dir);
        self.state_dir = root.join(&self.state_dir);
        self.generator.search_path = self
            .generator
            .search_path
            .iter()
            .map(|entry| root.join(entry))
            .collect();
        self
    }
}

/// Which result protocol the installed generator speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolProtocol {
    /// Reports each regenerated file
    #[default]
    Listing,
    /// Reports only how many files were regenerated
    Counting,
}

/// External generator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Program name looked up on the search path
    pub program: String,
    /// Result protocol of the installed generator version
    pub protocol: ToolProtocol,
    /// Directories or files searched for the program, in order
    pub search_path: Vec<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: "bean-codegen".to_string(),
            protocol: ToolProtocol::default(),
            search_path: vec![PathBuf::from("tools")],
        }
    }
}
