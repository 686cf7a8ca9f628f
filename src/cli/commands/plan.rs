//! Plan command implementation
//!
//! Handles `svcpack plan`: resolve without writing an archive.

use anyhow::Result;
use std::path::Path;

use super::common::utf8_service_root;
use super::json_emit::emit_plan_json;

use crate::pipeline::PackagingPipeline;
use crate::Config;

/// Execute the plan command
pub fn execute_plan_command(service_root: &Path, config: &Config, json: bool) -> Result<()> {
    let root = utf8_service_root(service_root)?;
    let pipeline = PackagingPipeline::from_config(root, config)?;
    let plan = pipeline.plan(&config.package.exclude, &config.package.include)?;

    if json {
        println!("{}", emit_plan_json(&plan)?);
        return Ok(());
    }

    for file in &plan.files {
        println!("{:04o} {}", file.mode, file.path);
    }
    eprintln!("{} files", plan.files.len());

    Ok(())
}
