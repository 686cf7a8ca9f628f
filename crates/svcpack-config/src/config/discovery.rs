use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use svcpack_utils::error::{ConfigError, SvcpackError};

use super::model::TomlConfig;
use super::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, CliArgs, Config, ConfigSource};

impl Config {
    /// Load configuration with precedence CLI > file > defaults.
    ///
    /// The file is `cli_args.config_path` when given, otherwise the first
    /// `.svcpack/config.toml` found searching upward from `start_dir`.
    ///
    /// # Errors
    ///
    /// Fails when an explicit config path does not exist, the file is not
    /// valid TOML for this schema, or the merged values do not validate.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut config = Self::default();
        let mut source_attribution = HashMap::new();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.is_file() {
                    return Err(SvcpackError::Config(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    })
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            let source = ConfigSource::Config;

            if let Some(package) = file_config.package {
                if let Some(include) = package.include {
                    config.package.include = include;
                    source_attribution.insert("package.include".to_string(), source);
                }
                if let Some(exclude) = package.exclude {
                    config.package.exclude = exclude;
                    source_attribution.insert("package.exclude".to_string(), source);
                }
                if let Some(name) = package.artifact_name {
                    config.package.artifact_name = Some(name);
                    source_attribution.insert("package.artifact_name".to_string(), source);
                }
            }

            if let Some(deps) = file_config.dependencies {
                if let Some(prune) = deps.prune {
                    config.dependencies.prune = prune;
                    source_attribution.insert("dependencies.prune".to_string(), source);
                }
                if let Some(manager) = deps.manager {
                    config.dependencies.manager = manager;
                    source_attribution.insert("dependencies.manager".to_string(), source);
                }
                if let Some(program) = deps.program {
                    config.dependencies.program = Some(program);
                    source_attribution.insert("dependencies.program".to_string(), source);
                }
                if let Some(manifest_file) = deps.manifest_file {
                    config.dependencies.manifest_file = manifest_file;
                    source_attribution.insert("dependencies.manifest_file".to_string(), source);
                }
                if let Some(cache_dir) = deps.cache_dir {
                    config.dependencies.cache_dir = cache_dir;
                    source_attribution.insert("dependencies.cache_dir".to_string(), source);
                }
                if let Some(timeout_secs) = deps.timeout_secs {
                    config.dependencies.timeout_secs = timeout_secs;
                    source_attribution.insert("dependencies.timeout_secs".to_string(), source);
                }
            }
        }

        // CLI overrides
        if !cli_args.include.is_empty() {
            config.package.include.clone_from(&cli_args.include);
            source_attribution.insert("package.include".to_string(), ConfigSource::Cli);
        }
        if !cli_args.exclude.is_empty() {
            config.package.exclude.clone_from(&cli_args.exclude);
            source_attribution.insert("package.exclude".to_string(), ConfigSource::Cli);
        }
        if let Some(name) = &cli_args.artifact_name {
            config.package.artifact_name = Some(name.clone());
            source_attribution.insert("package.artifact_name".to_string(), ConfigSource::Cli);
        }
        if cli_args.no_prune {
            config.dependencies.prune = false;
            source_attribution.insert("dependencies.prune".to_string(), ConfigSource::Cli);
        }

        config.config_path = config_path;
        config.source_attribution = source_attribution;
        config.validate()?;

        Ok(config)
    }

    /// Search upward from `start_dir` for `.svcpack/config.toml`, stopping
    /// at the filesystem root or a repository root (`.git`, `.hg`, `.svn`).
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);

        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }

            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists() {
                break;
            }

            current = dir.parent();
        }

        None
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).map_err(|e| {
            anyhow::Error::from(SvcpackError::Config(ConfigError::InvalidFile(format!(
                "{}: {}",
                path.display(),
                e.message()
            ))))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcpack_utils::test_support::ServiceFixture;

    fn write_config(fixture: &ServiceFixture, body: &str) {
        fixture.file(".svcpack/config.toml", body);
    }

    #[test]
    fn test_defaults_without_file() {
        let fixture = ServiceFixture::new();
        fixture.dir(".git");

        let config = Config::discover_from(fixture.root().as_std_path(), &CliArgs::default()).unwrap();

        assert!(config.config_path.is_none());
        assert!(config.dependencies.prune);
        assert_eq!(config.dependencies.manager, "npm");
        assert_eq!(config.source_of("package.include"), ConfigSource::Default);
    }

    #[test]
    fn test_file_values_are_loaded() {
        let fixture = ServiceFixture::new();
        write_config(
            &fixture,
            r#"
[package]
include = ["**"]
exclude = [".git/**"]
artifact_name = "api.zip"

[dependencies]
prune = false
cache_dir = "vendor"
timeout_secs = 30
"#,
        );

        let config = Config::discover_from(fixture.root().as_std_path(), &CliArgs::default()).unwrap();

        assert_eq!(config.package.include, vec!["**"]);
        assert_eq!(config.package.artifact_name.as_deref(), Some("api.zip"));
        assert!(!config.dependencies.prune);
        assert_eq!(config.dependencies.cache_dir, "vendor");
        assert_eq!(config.dependencies.timeout_secs, 30);
        assert_eq!(config.source_of("dependencies.cache_dir"), ConfigSource::Config);
        assert_eq!(config.source_of("dependencies.manager"), ConfigSource::Default);
    }

    #[test]
    fn test_cli_overrides_file() {
        let fixture = ServiceFixture::new();
        write_config(
            &fixture,
            "[package]\ninclude = [\"src/**\"]\nartifact_name = \"file.zip\"\n",
        );
        let cli = CliArgs {
            include: vec!["lib/**".to_string()],
            artifact_name: Some("cli.zip".to_string()),
            no_prune: true,
            ..CliArgs::default()
        };

        let config = Config::discover_from(fixture.root().as_std_path(), &cli).unwrap();

        assert_eq!(config.package.include, vec!["lib/**"]);
        assert_eq!(config.package.artifact_name.as_deref(), Some("cli.zip"));
        assert!(!config.dependencies.prune);
        assert_eq!(config.source_of("package.include"), ConfigSource::Cli);
        assert_eq!(config.source_of("dependencies.prune"), ConfigSource::Cli);
    }

    #[test]
    fn test_upward_discovery_from_nested_dir() {
        let fixture = ServiceFixture::new();
        write_config(&fixture, "[dependencies]\nmanifest_file = \"deps.json\"\n");
        fixture.dir("services/api");

        let found = Config::discover_config_file_from(fixture.path("services/api").as_std_path());
        assert_eq!(
            found,
            Some(fixture.path(".svcpack/config.toml").into_std_path_buf())
        );
    }

    #[test]
    fn test_discovery_stops_at_repository_root() {
        let fixture = ServiceFixture::new();
        write_config(&fixture, "");
        fixture.dir("repo/.git").dir("repo/service");

        assert!(Config::discover_config_file_from(fixture.path("repo/service").as_std_path()).is_none());
    }

    #[test]
    fn test_explicit_missing_path_is_not_found() {
        let fixture = ServiceFixture::new();
        let cli = CliArgs {
            config_path: Some(fixture.path("nope.toml").into_std_path_buf()),
            ..CliArgs::default()
        };

        let err = Config::discover_from(fixture.root().as_std_path(), &cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SvcpackError>(),
            Some(SvcpackError::Config(ConfigError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_unknown_key_is_invalid_file() {
        let fixture = ServiceFixture::new();
        write_config(&fixture, "[package]\nincludes = [\"**\"]\n");

        let err = Config::discover_from(fixture.root().as_std_path(), &CliArgs::default()).unwrap_err();
        let inner = err
            .chain()
            .find_map(|e| e.downcast_ref::<SvcpackError>())
            .expect("config error in chain");
        assert!(matches!(inner, SvcpackError::Config(ConfigError::InvalidFile(_))));
    }

    #[test]
    fn test_artifact_name_for_falls_back_to_dir_name() {
        let config = Config::default();
        assert_eq!(config.artifact_name_for(Path::new("/srv/billing")), "billing.zip");
        assert_eq!(config.artifact_name_for(Path::new("/")), "service.zip");
    }
}
