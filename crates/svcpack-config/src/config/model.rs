use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Default dependency-manager timeout in seconds
pub const DEFAULT_DEPENDENCY_TIMEOUT_SECS: u64 = 120;

/// Artifact name used when neither the CLI nor the file names one and the
/// service root has no usable directory name.
pub const DEFAULT_ARTIFACT_NAME: &str = "service.zip";

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from the configuration file.
    Config,
    /// Built-in default value (lowest precedence).
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Config => write!(f, "config"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// `[package]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// `None` derives the name from the service root directory.
    pub artifact_name: Option<String>,
}

/// `[dependencies]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependenciesConfig {
    pub prune: bool,
    /// Lister backend name.
    pub manager: String,
    /// Executable override for the backend.
    pub program: Option<String>,
    pub manifest_file: String,
    pub cache_dir: String,
    pub timeout_secs: u64,
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            prune: true,
            manager: "npm".to_string(),
            program: None,
            manifest_file: "package.json".to_string(),
            cache_dir: "node_modules".to_string(),
            timeout_secs: DEFAULT_DEPENDENCY_TIMEOUT_SECS,
        }
    }
}

/// Dependency-manager backends that can be named in `dependencies.manager`.
pub const KNOWN_MANAGERS: &[&str] = &["npm"];

/// Resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub package: PackageConfig,
    pub dependencies: DependenciesConfig,
    /// File the values were loaded from, if any.
    pub config_path: Option<PathBuf>,
    pub(crate) source_attribution: HashMap<String, ConfigSource>,
}

impl Config {
    /// Source of `key`, `Default` when it was never overridden.
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .copied()
            .unwrap_or(ConfigSource::Default)
    }

    /// Artifact name for a run over `service_root`: the configured name, or
    /// `<directory name>.zip`.
    #[must_use]
    pub fn artifact_name_for(&self, service_root: &std::path::Path) -> String {
        if let Some(name) = &self.package.artifact_name {
            return name.clone();
        }
        service_root
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .map_or_else(|| DEFAULT_ARTIFACT_NAME.to_string(), |n| format!("{n}.zip"))
    }
}

/// `[package]` as written in the file; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PackageFile {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub artifact_name: Option<String>,
}

/// `[dependencies]` as written in the file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DependenciesFile {
    pub prune: Option<bool>,
    pub manager: Option<String>,
    pub program: Option<String>,
    pub manifest_file: Option<String>,
    pub cache_dir: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlConfig {
    pub package: Option<PackageFile>,
    pub dependencies: Option<DependenciesFile>,
}
