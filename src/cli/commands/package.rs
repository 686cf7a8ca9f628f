//! Package command implementation
//!
//! Handles `svcpack package` and `svcpack package --json`.

use anyhow::Result;
use std::path::Path;

use super::common::utf8_service_root;
use super::json_emit::emit_package_json;

use crate::pipeline::PackagingPipeline;
use crate::Config;
use svcpack_pruner::ManifestOutcome;
use svcpack_utils::logging::Logger;

/// Execute the package command
pub fn execute_package_command(
    service_root: &Path,
    config: &Config,
    force: bool,
    lock_ttl_seconds: Option<u64>,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let mut logger = Logger::new(verbose);
    let root = utf8_service_root(service_root)?;
    let artifact_name = config.artifact_name_for(service_root);

    logger.verbose_fmt(format_args!("Service root: {root}"));
    if let Some(path) = &config.config_path {
        logger.verbose_fmt(format_args!("Config file: {}", path.display()));
    }

    let pipeline = PackagingPipeline::from_config(root, config)?
        .force(force)
        .lock_ttl(lock_ttl_seconds);

    logger.start_timing("package");
    let report = pipeline.package_with_report(
        &config.package.exclude,
        &config.package.include,
        &artifact_name,
    )?;
    logger.end_timing("package");

    if let Some(prune) = &report.prune {
        for manifest in &prune.manifests {
            match &manifest.outcome {
                ManifestOutcome::Contributed { dependencies } => logger.verbose_fmt(format_args!(
                    "{}: kept {dependencies} production dependencies",
                    manifest.manifest
                )),
                ManifestOutcome::NoProductionDependencies => logger.verbose_fmt(format_args!(
                    "{}: no production dependencies",
                    manifest.manifest
                )),
                ManifestOutcome::Failed { reason } => eprintln!(
                    "Warning: could not list dependencies for {} ({reason}); packaging its {} unfiltered",
                    manifest.manifest, config.dependencies.cache_dir
                ),
            }
        }
    }

    if json {
        println!("{}", emit_package_json(&report)?);
    } else {
        println!("{}", report.artifact);
    }

    logger.verbose_fmt(format_args!(
        "{} files, {} bytes in, blake3 {}",
        report.archive.entries_written, report.archive.bytes_in, report.archive.blake3
    ));
    for timing in logger.get_timing_summary() {
        logger.verbose_fmt(format_args!(
            "{}: {:.3}s",
            timing.operation,
            timing.duration.as_secs_f64()
        ));
    }

    Ok(())
}
