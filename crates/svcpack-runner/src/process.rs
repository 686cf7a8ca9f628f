use crate::error::RunnerError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use super::CommandSpec;

// ============================================================================
// ProcessRunner Trait - process execution interface
// ============================================================================

/// Output from a process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Standard output from the process
    pub stdout: Vec<u8>,
    /// Standard error from the process
    pub stderr: Vec<u8>,
    /// Exit code (None if terminated by signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    /// Stdout as UTF-8, lossy.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Stderr as UTF-8, lossy.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// True when the process exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Synchronous process execution.
///
/// Implementations MUST use argv-style APIs only and MUST honor
/// [`CommandSpec::cwd`] instead of changing the caller's current directory.
/// A non-zero exit is not an error at this layer; it is reported through
/// [`ProcessOutput::exit_code`].
pub trait ProcessRunner {
    /// Execute `cmd`, waiting at most `timeout` for it to finish.
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError>;
}

/// Runs commands directly on the host.
///
/// Drives a private current-thread Tokio runtime to enforce the timeout, so it
/// must not be called from inside another Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolve a bare program name through `PATH` (and `PATHEXT` on Windows,
    /// where `npm` is really `npm.cmd`). Paths are used as given.
    fn resolve_program(cmd: &CommandSpec) -> Result<CommandSpec, RunnerError> {
        let program = Path::new(&cmd.program);
        if program.components().count() > 1 {
            return Ok(cmd.clone());
        }

        match which::which(&cmd.program) {
            Ok(resolved) => {
                let mut resolved_cmd = cmd.clone();
                resolved_cmd.program = resolved.into_os_string();
                Ok(resolved_cmd)
            }
            Err(_) => Err(RunnerError::ProgramNotFound {
                program: cmd.program.to_string_lossy().into_owned(),
            }),
        }
    }
}

impl ProcessRunner for NativeRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        let program = cmd.program.to_string_lossy().into_owned();
        let resolved = Self::resolve_program(cmd)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RunnerError::ExecutionFailed {
                program: program.clone(),
                reason: format!("failed to start runtime: {e}"),
            })?;

        runtime.block_on(async {
            let mut command = resolved.to_tokio_command();
            command
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let child = command.spawn().map_err(|e| RunnerError::SpawnFailed {
                program: program.clone(),
                reason: e.to_string(),
            })?;

            match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(Ok(output)) => Ok(ProcessOutput::new(
                    output.stdout,
                    output.stderr,
                    output.status.code(),
                )),
                Ok(Err(e)) => Err(RunnerError::ExecutionFailed {
                    program: program.clone(),
                    reason: e.to_string(),
                }),
                // The child is dropped with the future and killed (kill_on_drop)
                Err(_) => Err(RunnerError::Timeout {
                    timeout_seconds: timeout.as_secs(),
                }),
            }
        })
    }
}
