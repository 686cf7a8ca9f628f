//! Exit code constants for svcpack.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments, configuration or patterns |
//! | 5 | `ARCHIVE_FAILED` | The artifact could not be written |
//! | 9 | `LOCK_HELD` | Another process is packaging the same service root |

/// Exit codes matching the documented exit code table.
///
/// The numeric values are part of the CLI contract.
///
/// ```rust
/// use svcpack_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::LOCK_HELD, ExitCode::from_i32(9));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments, configuration or glob patterns
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Archive failure - the artifact could not be produced
    pub const ARCHIVE_FAILED: ExitCode = ExitCode(5);

    /// Lock held - another process is packaging the same service root
    pub const LOCK_HELD: ExitCode = ExitCode(9);

    /// Get the numeric exit code value for `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::ARCHIVE_FAILED.as_i32(), 5);
        assert_eq!(ExitCode::LOCK_HELD.as_i32(), 9);
    }

    #[test]
    fn test_exit_code_conversions() {
        let code: ExitCode = 5.into();
        assert_eq!(code, ExitCode::ARCHIVE_FAILED);
        let raw: i32 = ExitCode::LOCK_HELD.into();
        assert_eq!(raw, 9);
    }
}
