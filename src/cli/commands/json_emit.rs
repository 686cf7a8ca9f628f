//! JSON emit functions for CLI output

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::pipeline::{PackagingPlan, PackagingReport};

/// A configuration value with the layer it came from.
#[derive(Debug, Serialize)]
pub struct ConfigValue<'a> {
    pub value: &'a str,
    pub source: &'a str,
}

pub fn emit_package_json(report: &PackagingReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to emit package JSON")
}

pub fn emit_plan_json(plan: &PackagingPlan) -> Result<String> {
    serde_json::to_string_pretty(plan).context("Failed to emit plan JSON")
}

/// Emit effective configuration as `{ key: { value, source } }`, keys sorted.
pub fn emit_config_json(effective: &BTreeMap<String, (String, String)>) -> Result<String> {
    let values: BTreeMap<&str, ConfigValue<'_>> = effective
        .iter()
        .map(|(key, (value, source))| (key.as_str(), ConfigValue { value, source }))
        .collect();
    serde_json::to_string_pretty(&values).context("Failed to emit config JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_shape() {
        let mut effective = BTreeMap::new();
        effective.insert(
            "dependencies.manager".to_string(),
            ("npm".to_string(), "default".to_string()),
        );

        let json = emit_config_json(&effective).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["dependencies.manager"]["value"], "npm");
        assert_eq!(parsed["dependencies.manager"]["source"], "default");
    }
}
