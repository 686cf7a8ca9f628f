//! Config command implementation

use anyhow::Result;

use super::json_emit::emit_config_json;

use crate::Config;

/// Execute the config command
pub fn execute_config_command(config: &Config, json: bool) -> Result<()> {
    let effective = config.effective_config();

    if json {
        println!("{}", emit_config_json(&effective)?);
        return Ok(());
    }

    match &config.config_path {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!("\n  Effective configuration:");
    for (key, (value, source)) in effective {
        println!("    {key} = {value} (from {source})");
    }

    Ok(())
}
