use std::collections::BTreeMap;

use super::Config;

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();
        let mut add = |key: &str, value: String| {
            config.insert(key.to_string(), (value, self.source_of(key).to_string()));
        };

        add("package.include", self.package.include.join(", "));
        add("package.exclude", self.package.exclude.join(", "));
        if let Some(name) = &self.package.artifact_name {
            add("package.artifact_name", name.clone());
        }

        add("dependencies.prune", self.dependencies.prune.to_string());
        add("dependencies.manager", self.dependencies.manager.clone());
        if let Some(program) = &self.dependencies.program {
            add("dependencies.program", program.clone());
        }
        add("dependencies.manifest_file", self.dependencies.manifest_file.clone());
        add("dependencies.cache_dir", self.dependencies.cache_dir.clone());
        add("dependencies.timeout_secs", self.dependencies.timeout_secs.to_string());

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CliArgs, ConfigSource};
    use svcpack_utils::test_support::ServiceFixture;

    #[test]
    fn test_effective_config_reports_sources() {
        let fixture = ServiceFixture::new();
        fixture.file(".svcpack/config.toml", "[dependencies]\ntimeout_secs = 45\n");
        let cli = CliArgs {
            exclude: vec!["*.md".to_string()],
            ..CliArgs::default()
        };

        let config = Config::discover_from(fixture.root().as_std_path(), &cli).unwrap();
        let effective = config.effective_config();

        assert_eq!(
            effective["dependencies.timeout_secs"],
            ("45".to_string(), ConfigSource::Config.to_string())
        );
        assert_eq!(
            effective["package.exclude"],
            ("*.md".to_string(), "cli".to_string())
        );
        assert_eq!(effective["dependencies.manager"].1, "default");
        assert!(!effective.contains_key("package.artifact_name"));
    }
}
