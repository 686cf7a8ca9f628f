use std::fmt;
use std::io;
use thiserror::Error;

pub use svcpack_lock::LockError;
pub use svcpack_runner::RunnerError;

/// Library-level error type with rich context and user-friendly reporting.
///
/// # Error Categories
///
/// | Category | Description |
/// |----------|-------------|
/// | `Config` | Configuration file or CLI argument errors |
/// | `Selector` | Invalid glob patterns |
/// | `Archive` | The artifact could not be produced |
/// | `Lock` | Another packaging run holds the service root |
/// | `Runner` | Dependency-manager process errors that escaped pruning |
///
/// Dependency-manager failures during pruning are recovered inside the pruner
/// and never surface here; they are reported through the prune report.
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors, invalid patterns |
/// | 5 | Archive could not be written |
/// | 9 | Lock held |
/// | 1 | Other errors |
///
/// Library code returns `SvcpackError` and does NOT call `std::process::exit()`.
#[derive(Error, Debug)]
pub enum SvcpackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pattern error: {0}")]
    Selector(#[from] SelectorError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("File lock error: {0}")]
    Lock(#[from] LockError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    FileSystem,
    Archive,
    Concurrency,
    DependencyManager,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::FileSystem => write!(f, "File System"),
            Self::Archive => write!(f, "Archive"),
            Self::Concurrency => write!(f, "Concurrency"),
            Self::DependencyManager => write!(f, "Dependency Manager"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with optional [package] and [dependencies] sections."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' option has specific format requirements."
            )),
            Self::NotFound { .. } => Some(
                "svcpack searches for .svcpack/config.toml starting at the service root and walking upward."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of .svcpack/config.toml".to_string(),
                "Remove unknown keys; only [package] and [dependencies] are read".to_string(),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "artifact_name" => vec![
                    "Use a plain file name such as 'service.zip'".to_string(),
                    "Do not include path separators in the artifact name".to_string(),
                ],
                "package.include" | "package.exclude" => vec![
                    "Check glob syntax: '*' matches within one directory, '**' across directories"
                        .to_string(),
                    "Close every '{' and '[' in the pattern".to_string(),
                ],
                "dependencies.manager" => vec!["Use 'npm'".to_string()],
                _ => vec![
                    "Check the documentation for valid values for this option".to_string(),
                    "Remove the option to use the default value".to_string(),
                ],
            },
            Self::NotFound { .. } => vec![
                "Pass --config with an existing file, or drop the flag to use defaults".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Glob pattern errors
#[derive(Error, Debug)]
pub enum SelectorError {
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl UserFriendlyError for SelectorError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidPattern { pattern, reason } => {
                format!("Pattern '{pattern}' is not a valid glob: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        Some(
            "Exclude patterns drop matching files; a leading '!' or an include pattern re-adds them."
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        vec![
            "Check for unbalanced '{', '}' or '[' characters".to_string(),
            "Quote patterns on the command line so the shell does not expand them".to_string(),
        ]
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Errors raised while producing the archive. Each variant keeps the
/// underlying cause as its `source`.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    ReadEntry {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Archive encoder failed on {entry}: {source}")]
    Encoder {
        entry: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to persist archive to {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl UserFriendlyError for ArchiveError {
    fn user_message(&self) -> String {
        match self {
            Self::OutputDir { path, .. } => format!("Cannot create output directory {path}"),
            Self::ReadEntry { path, source } => format!("Cannot read {path}: {source}"),
            Self::Encoder { entry, source } => {
                format!("Compression failed while adding {entry}: {source}")
            }
            Self::Persist { path, source } => format!("Cannot write artifact {path}: {source}"),
        }
    }

    fn context(&self) -> Option<String> {
        Some("The artifact is written to a temporary file and moved into place only when complete; no partial artifact was left behind.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ReadEntry { .. } => vec![
                "Check read permissions on the listed file".to_string(),
                "Exclude the file if it should not be packaged".to_string(),
            ],
            _ => vec![
                "Ensure sufficient disk space is available".to_string(),
                "Verify the .packaging-output directory is writable".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Encoder { .. } => ErrorCategory::Archive,
            _ => ErrorCategory::FileSystem,
        }
    }
}

impl UserFriendlyError for LockError {
    fn user_message(&self) -> String {
        match self {
            Self::ConcurrentExecution {
                service_root, pid, ..
            } => format!("Another svcpack process (PID {pid}) is packaging {service_root}"),
            Self::StaleLock {
                service_root,
                age_secs,
                ..
            } => format!("A stale packaging lock ({age_secs}s old) exists for {service_root}"),
            Self::CorruptedLock { reason } => format!("The packaging lock is corrupted: {reason}"),
            Self::AcquisitionFailed { reason } => format!("Could not take the packaging lock: {reason}"),
            Self::ReleaseFailed { reason } => format!("Could not release the packaging lock: {reason}"),
            Self::Io(e) => format!("Lock file operation failed: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        Some("Only one packaging run per service root may execute at a time.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ConcurrentExecution { .. } => vec![
                "Wait for the other packaging run to finish".to_string(),
                "Use --force if the other process is known to be gone".to_string(),
            ],
            Self::StaleLock { .. } | Self::CorruptedLock { .. } => vec![
                "Re-run with --force to override the lock".to_string(),
                "Or delete .packaging-output/.lock manually".to_string(),
            ],
            _ => vec!["Check write permissions on .packaging-output".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Concurrency
    }
}

impl UserFriendlyError for RunnerError {
    fn user_message(&self) -> String {
        match self {
            Self::ProgramNotFound { program } => format!("'{program}' was not found on PATH"),
            Self::SpawnFailed { program, reason } => format!("Could not start '{program}': {reason}"),
            Self::ExecutionFailed { program, reason } => {
                format!("'{program}' failed while running: {reason}")
            }
            Self::Timeout { timeout_seconds } => {
                format!("The dependency manager did not finish within {timeout_seconds}s")
            }
        }
    }

    fn context(&self) -> Option<String> {
        Some("The dependency manager is queried once per discovered manifest.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ProgramNotFound { .. } => vec![
                "Install the dependency manager or set [dependencies].program".to_string(),
                "Use --no-prune to package without dependency pruning".to_string(),
            ],
            Self::Timeout { .. } => vec![
                "Increase [dependencies].timeout_secs".to_string(),
            ],
            _ => vec!["Run the dependency manager manually in the manifest directory".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::DependencyManager
    }
}

impl UserFriendlyError for SvcpackError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Selector(e) => e.user_message(),
            Self::Archive(e) => e.user_message(),
            Self::Lock(e) => e.user_message(),
            Self::Runner(e) => e.user_message(),
            Self::Io(e) => format!("File system operation failed: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Selector(e) => e.context(),
            Self::Archive(e) => e.context(),
            Self::Lock(e) => e.context(),
            Self::Runner(e) => e.context(),
            Self::Io(_) => {
                Some("This usually indicates a permissions issue or disk space problem.".to_string())
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Selector(e) => e.suggestions(),
            Self::Archive(e) => e.suggestions(),
            Self::Lock(e) => e.suggestions(),
            Self::Runner(e) => e.suggestions(),
            Self::Io(_) => vec![
                "Check file permissions under the service root".to_string(),
                "Ensure sufficient disk space is available".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::Selector(_) => ErrorCategory::Configuration,
            Self::Archive(e) => e.category(),
            Self::Lock(_) => ErrorCategory::Concurrency,
            Self::Runner(_) => ErrorCategory::DependencyManager,
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl SvcpackError {
    /// Render the error for end users:
    ///
    /// ```text
    /// Error: <user message>
    ///
    /// Context: <context if available>
    ///
    /// Suggestions:
    ///   • <suggestion 1>
    /// ```
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }

    /// Map this error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            Self::Config(_) | Self::Selector(_) => ExitCode::CLI_ARGS,
            Self::Archive(_) => ExitCode::ARCHIVE_FAILED,
            Self::Lock(_) => ExitCode::LOCK_HELD,
            Self::Runner(_) | Self::Io(_) => ExitCode::INTERNAL,
        }
    }
}
