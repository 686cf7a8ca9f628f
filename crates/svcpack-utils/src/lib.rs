//! Shared foundation for the svcpack crates: error types and their
//! user-facing rendering, exit codes, logging setup and path helpers.

pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod paths;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use error::{
    ArchiveError, ConfigError, ErrorCategory, LockError, RunnerError, SelectorError,
    SvcpackError, UserFriendlyError,
};
pub use exit_codes::ExitCode;
