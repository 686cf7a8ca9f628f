//! Glob-based file-set resolution.
//!
//! A [`PatternSet`] is an ordered list of include and exclude rules. The
//! [`GlobResolver`] walks a root directory and keeps every regular file whose
//! last matching rule is an include.

pub mod pattern;
pub mod resolver;

pub use pattern::{CompiledPatterns, PatternRule, PatternSet, validate_patterns};
pub use resolver::{GlobResolver, ResolvedFile, ResolvedFileList};

/// Pattern that selects every file, hidden ones included.
pub const CATCH_ALL: &str = "**";
