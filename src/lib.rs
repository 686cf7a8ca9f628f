//! svcpack - package a service directory into a deployable zip
//!
//! The pipeline resolves a file list from include/exclude globs, prunes each
//! dependency cache (`node_modules`) down to production dependencies as
//! reported by the dependency manager, and writes a deterministic zip to
//! `<service root>/.packaging-output/<artifact name>`.
//!
//! svcpack can be used in two ways:
//! - **CLI**: `svcpack package`, `svcpack plan`, `svcpack config`
//! - **Library**: [`PackagingPipeline`]
//!
//! # Quick Start (Library)
//!
//! ```no_run
//! use svcpack::PackagingPipeline;
//!
//! let pipeline = PackagingPipeline::new("/srv/functions/api");
//! let artifact = pipeline.package(
//!     &["test/**".to_string()],
//!     &["**".to_string()],
//!     "api.zip",
//! )?;
//! println!("wrote {artifact}");
//! # Ok::<(), svcpack::SvcpackError>(())
//! ```
//!
//! # Pattern Semantics
//!
//! Every path starts selected. Excludes apply in declaration order, then
//! includes, and the last matching rule decides, so an include always wins
//! over an exclude. An exclude written as `!p` is the include `p`.
//!
//! # Crates
//!
//! | Crate | Role |
//! |-------|------|
//! | `svcpack-selectors` | Pattern sets and file resolution |
//! | `svcpack-pruner` | Manifest discovery and production-dependency patterns |
//! | `svcpack-archive` | Zip writing |
//! | `svcpack-lock` | Per-service-root packaging lock |
//! | `svcpack-runner` | Subprocess execution with timeouts |
//! | `svcpack-config` | TOML configuration with source attribution |
//! | `svcpack-utils` | Errors, exit codes, logging, path helpers |

pub mod cli;
pub mod pipeline;

pub use pipeline::{PackagingPipeline, PackagingPlan, PackagingReport, lister_for};

pub use svcpack_archive::{ArchiveSummary, ArchiveWriter};
pub use svcpack_config::{CliArgs, Config, ConfigSource};
pub use svcpack_lock::{LockInfo, PackagingLock};
pub use svcpack_pruner::{
    DependencyLister, DependencyPath, DependencyPruner, ListerError, ManifestOutcome,
    ManifestReport, NpmLister, PruneReport,
};
pub use svcpack_runner::{CommandSpec, NativeRunner, ProcessOutput, ProcessRunner};
pub use svcpack_selectors::{GlobResolver, PatternSet, ResolvedFile, ResolvedFileList};
pub use svcpack_utils::{
    ArchiveError, ConfigError, ExitCode, LockError, RunnerError, SelectorError, SvcpackError,
};
