//! Production-dependency pruning.
//!
//! The pruner finds dependency manifests under the caller's include roots,
//! asks a [`DependencyLister`] which cached dependency directories are needed
//! in production, and turns the answer into exclude/include glob patterns: the
//! whole cache directory is excluded, the production subtrees re-included.
//!
//! Pruning is best-effort. Failures are recorded in the [`PruneReport`] and
//! never abort packaging.

pub mod lister;
pub mod pruner;

pub use lister::{DependencyLister, DependencyPath, ListerError, NpmLister, parse_parseable_output};
pub use pruner::{DependencyPruner, ManifestOutcome, ManifestReport, PruneReport, union_into};

#[cfg(any(test, feature = "test-utils"))]
pub use lister::StaticLister;

/// Default manifest file name.
pub const DEFAULT_MANIFEST_FILE: &str = "package.json";

/// Default dependency-cache directory name.
pub const DEFAULT_CACHE_DIR: &str = "node_modules";
