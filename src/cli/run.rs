//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Initializes tracing
//! - Builds CliArgs and discovers Config
//! - Dispatches to command handlers
//! - Handles all error output

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use super::args::{Cli, Commands, PatternArgs};
use super::commands;

use crate::{CliArgs, Config, ConfigError, ExitCode, SvcpackError};
use svcpack_utils::logging::init_tracing;

/// Main CLI execution function.
///
/// This function handles ALL output including errors. It returns `Result<(), ExitCode>`:
/// - On success: returns `Ok(())` after printing any output
/// - On error: prints the error report to stderr, returns `Err(ExitCode)`
///
/// main.rs only calls `std::process::exit(code.as_i32())` on error - it does NOT print.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.log_json) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let operation = cli.command.name();
    let result = dispatch(cli);

    if let Err(error) = result {
        if let Some(svcpack_error) = error.downcast_ref::<SvcpackError>() {
            eprintln!("{}", svcpack_error.display_for_user());
            return Err(svcpack_error.to_exit_code());
        }

        eprintln!("✗ {operation} failed: {error:#}");
        eprintln!("\n  Run with --verbose for more detailed output");
        return Err(ExitCode::INTERNAL);
    }

    Ok(())
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Package {
            patterns,
            name,
            force,
            lock_ttl_seconds,
            json,
        } => {
            let service_root = service_root_or_cwd(patterns.service_root.as_deref())?;
            let cli_args = cli_args_from(cli.config, &patterns, name);
            let config = Config::discover_from(&service_root, &cli_args)?;
            commands::execute_package_command(
                &service_root,
                &config,
                force,
                lock_ttl_seconds,
                json,
                cli.verbose,
            )
        }
        Commands::Plan { patterns, json } => {
            let service_root = service_root_or_cwd(patterns.service_root.as_deref())?;
            let cli_args = cli_args_from(cli.config, &patterns, None);
            let config = Config::discover_from(&service_root, &cli_args)?;
            commands::execute_plan_command(&service_root, &config, json)
        }
        Commands::Config { service_root, json } => {
            let service_root = service_root_or_cwd(service_root.as_deref())?;
            let cli_args = CliArgs {
                config_path: cli.config,
                ..CliArgs::default()
            };
            let config = Config::discover_from(&service_root, &cli_args)?;
            commands::execute_config_command(&config, json)
        }
    }
}

fn cli_args_from(config_path: Option<PathBuf>, patterns: &PatternArgs, name: Option<String>) -> CliArgs {
    CliArgs {
        config_path,
        include: patterns.include.clone(),
        exclude: patterns.exclude.clone(),
        artifact_name: name,
        no_prune: patterns.no_prune,
    }
}

/// Canonical service root: `explicit` when given, else the current directory.
fn service_root_or_cwd(explicit: Option<&Path>) -> Result<PathBuf> {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };

    if !root.is_dir() {
        return Err(SvcpackError::Config(ConfigError::InvalidValue {
            key: "service_root".to_string(),
            value: format!("{} is not a directory", root.display()),
        })
        .into());
    }

    Ok(std::fs::canonicalize(&root)?)
}
