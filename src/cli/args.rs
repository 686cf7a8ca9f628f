//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and all subcommand enums.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// svcpack - package a service directory into a deployable zip
#[derive(Parser)]
#[command(name = "svcpack")]
#[command(about = "Package a service directory into a deployable zip, keeping only production dependencies")]
#[command(long_about = r#"
svcpack resolves a service directory into a file list using include/exclude
globs, prunes development-only dependencies from each node_modules directory,
and writes a deterministic zip to <service root>/.packaging-output/.

EXAMPLES:
  # Package the current directory
  svcpack package

  # Package another directory under a fixed artifact name
  svcpack package --service-root ./functions/api --name api.zip

  # Keep tests out, but re-include one fixture the handler reads at runtime
  svcpack package --exclude 'test/**' --include 'test/fixtures/schema.json'

  # Show what would be packaged, with permission bits
  svcpack plan --exclude '*.md'

  # Show the effective configuration and where each value came from
  svcpack config --json

PATTERNS:
  Every file starts selected. Excludes are applied in order, then includes,
  so an include always wins over an exclude. An exclude prefixed with '!'
  behaves like an include.

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from the service root for
  .svcpack/config.toml, stopping at the repository root
  Use --config to specify an explicit config file path
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by commands that resolve a file list.
#[derive(Args, Debug, Clone, Default)]
pub struct PatternArgs {
    /// Service directory to package (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub service_root: Option<PathBuf>,

    /// Glob of files to leave out (repeatable; '!' prefix re-includes)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Glob of files to keep even when excluded (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Skip dependency pruning
    #[arg(long)]
    pub no_prune: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Package the service root into a zip artifact
    ///
    /// The artifact is written to <service root>/.packaging-output/<name>.
    /// Production dependencies are queried per manifest; if the dependency
    /// manager fails, that cache directory is packaged unfiltered.
    ///
    /// EXAMPLES:
    ///   svcpack package
    ///   svcpack package --name api.zip --exclude 'docs/**'
    ///   svcpack package --no-prune --json
    Package {
        #[command(flatten)]
        patterns: PatternArgs,

        /// Artifact file name (defaults to <service dir name>.zip)
        #[arg(long, value_name = "FILE")]
        name: Option<String>,

        /// Override an existing packaging lock
        #[arg(long)]
        force: bool,

        /// Age in seconds after which an abandoned lock is reported as stale
        #[arg(long, value_name = "SECS")]
        lock_ttl_seconds: Option<u64>,

        /// Print a JSON report instead of the artifact path
        #[arg(long)]
        json: bool,
    },

    /// Show the files that would be packaged without writing an archive
    Plan {
        #[command(flatten)]
        patterns: PatternArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration with value sources
    Config {
        /// Directory to start config discovery from (defaults to the current directory)
        #[arg(long, value_name = "DIR")]
        service_root: Option<PathBuf>,

        /// Print the configuration as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Name used in error reports.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Package { .. } => "package",
            Self::Plan { .. } => "plan",
            Self::Config { .. } => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repeatable_patterns() {
        let cli = Cli::try_parse_from([
            "svcpack",
            "package",
            "--exclude",
            "test/**",
            "--exclude",
            "!test/keep.js",
            "--include",
            "docs/api.md",
            "--name",
            "api.zip",
        ])
        .unwrap();

        let Commands::Package { patterns, name, .. } = cli.command else {
            panic!("expected package command");
        };
        assert_eq!(patterns.exclude, vec!["test/**", "!test/keep.js"]);
        assert_eq!(patterns.include, vec!["docs/api.md"]);
        assert_eq!(name.as_deref(), Some("api.zip"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["svcpack", "plan", "--verbose", "--config", "x.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["svcpack"]).is_err());
    }
}
