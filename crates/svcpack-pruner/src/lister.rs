use camino::Utf8Path;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use svcpack_runner::{CommandSpec, NativeRunner, ProcessRunner, RunnerError};
use thiserror::Error;
use tracing::debug;

use crate::DEFAULT_CACHE_DIR;

/// Cached dependency directory relative to its manifest's directory,
/// `/`-separated and without a trailing slash (`node_modules/express`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DependencyPath(String);

impl DependencyPath {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a production listing could not be obtained for one manifest.
#[derive(Error, Debug)]
pub enum ListerError {
    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("{program} exited with {status}: {stderr}")]
    NonZeroExit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} reported errors: {stderr}")]
    ErrorOutput { program: String, stderr: String },

    #[error("{0}")]
    Backend(String),
}

/// A dependency-manager backend that reports production dependencies.
pub trait DependencyLister: Send + Sync {
    /// Backend name as used in configuration (`npm`).
    fn name(&self) -> &str;

    /// Production-required cached dependency directories for the manifest in
    /// `manifest_dir`, deduplicated in first-seen order.
    ///
    /// Implementations must scope any subprocess to `manifest_dir` through its
    /// own working directory and must not change the current directory of the
    /// calling process.
    fn list_production(&self, manifest_dir: &Utf8Path) -> Result<Vec<DependencyPath>, ListerError>;
}

/// Lists production dependencies with `npm ls --all --omit=dev --parseable`.
///
/// npm 7 and later print only top-level packages unless `--all` is given.
/// `--prod=true` is passed alongside `--omit=dev` for npm 6, which does not
/// know `--omit` and ignores it.
pub struct NpmLister {
    program: String,
    cache_dir: String,
    timeout: Duration,
    runner: Box<dyn ProcessRunner + Send + Sync>,
}

const NPM_LS_ARGS: [&str; 6] = [
    "ls",
    "--all",
    "--omit=dev",
    "--prod=true",
    "--parseable=true",
    "--silent",
];

impl NpmLister {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    #[must_use]
    pub fn new() -> Self {
        Self {
            program: "npm".to_string(),
            cache_dir: DEFAULT_CACHE_DIR.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            runner: Box::new(NativeRunner::new()),
        }
    }

    /// Executable to run instead of `npm`.
    #[must_use]
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn cache_dir(mut self, cache_dir: impl Into<String>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner: impl ProcessRunner + Send + Sync + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    /// The command run for `manifest_dir`.
    #[must_use]
    pub fn command(&self, manifest_dir: &Utf8Path) -> CommandSpec {
        CommandSpec::new(&self.program)
            .args(NPM_LS_ARGS)
            .cwd(manifest_dir.as_std_path())
            .env("NO_UPDATE_NOTIFIER", "1")
    }
}

impl Default for NpmLister {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NpmLister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NpmLister")
            .field("program", &self.program)
            .field("cache_dir", &self.cache_dir)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DependencyLister for NpmLister {
    fn name(&self) -> &str {
        "npm"
    }

    fn list_production(&self, manifest_dir: &Utf8Path) -> Result<Vec<DependencyPath>, ListerError> {
        let output = self.runner.run(&self.command(manifest_dir), self.timeout)?;
        let stderr = output.stderr_string().trim().to_string();

        if !output.success() {
            return Err(ListerError::NonZeroExit {
                program: self.program.clone(),
                status: output
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |code| format!("code {code}")),
                stderr,
            });
        }
        if !stderr.is_empty() {
            return Err(ListerError::ErrorOutput {
                program: self.program.clone(),
                stderr,
            });
        }

        // npm prints paths below its real working directory.
        let real_dir = manifest_dir
            .canonicalize_utf8()
            .unwrap_or_else(|_| manifest_dir.to_path_buf());
        Ok(parse_parseable_output(
            &output.stdout_string(),
            &real_dir,
            &self.cache_dir,
        ))
    }
}

/// Extract dependency paths from `--parseable` output.
///
/// Each line is an absolute directory. A line is kept when, relative to
/// `manifest_dir`, it lies under `<cache_dir>/`; the manifest directory itself
/// and packages hoisted outside it are ignored. Backslashes are treated as
/// separators.
#[must_use]
pub fn parse_parseable_output(
    stdout: &str,
    manifest_dir: &Utf8Path,
    cache_dir: &str,
) -> Vec<DependencyPath> {
    let base = normalize_separators(manifest_dir.as_str());
    let marker = format!("{cache_dir}/");
    let mut deps: Vec<DependencyPath> = Vec::new();

    for line in stdout.lines() {
        let line = normalize_separators(line.trim());
        if line.is_empty() || line == base {
            continue;
        }
        let Some(rel) = line
            .strip_prefix(base.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            debug!(path = %line, manifest_dir = %manifest_dir, "Ignoring dependency outside the manifest directory");
            continue;
        };
        if rel.strip_prefix(marker.as_str()).is_none_or(str::is_empty) {
            continue;
        }

        let dep = DependencyPath::new(rel);
        if !deps.contains(&dep) {
            deps.push(dep);
        }
    }

    deps
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/").trim_end_matches('/').to_string()
}

/// Scripted lister for tests. Directories without a script list nothing.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct StaticLister {
    scripts: std::collections::HashMap<camino::Utf8PathBuf, Result<Vec<String>, String>>,
    calls: std::sync::Mutex<Vec<camino::Utf8PathBuf>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl StaticLister {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `deps` for `manifest_dir`.
    #[must_use]
    pub fn with(mut self, manifest_dir: impl Into<camino::Utf8PathBuf>, deps: &[&str]) -> Self {
        self.scripts.insert(
            manifest_dir.into(),
            Ok(deps.iter().map(|d| (*d).to_string()).collect()),
        );
        self
    }

    /// Fail with `reason` for `manifest_dir`.
    #[must_use]
    pub fn failing(mut self, manifest_dir: impl Into<camino::Utf8PathBuf>, reason: &str) -> Self {
        self.scripts
            .insert(manifest_dir.into(), Err(reason.to_string()));
        self
    }

    /// Directories queried so far, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the call log mutex is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<camino::Utf8PathBuf> {
        self.calls.lock().expect("call log poisoned").clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl DependencyLister for StaticLister {
    fn name(&self) -> &str {
        "static"
    }

    fn list_production(&self, manifest_dir: &Utf8Path) -> Result<Vec<DependencyPath>, ListerError> {
        self.calls
            .lock()
            .expect("call log poisoned")
            .push(manifest_dir.to_path_buf());

        match self.scripts.get(manifest_dir) {
            Some(Ok(deps)) => Ok(deps.iter().map(DependencyPath::new).collect()),
            Some(Err(reason)) => Err(ListerError::Backend(reason.clone())),
            None => Ok(Vec::new()),
        }
    }
}
