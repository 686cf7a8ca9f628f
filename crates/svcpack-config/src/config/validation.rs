use svcpack_selectors::validate_patterns;
use svcpack_utils::error::{ConfigError, SvcpackError};
use svcpack_utils::paths::is_plain_file_name;

use super::{Config, KNOWN_MANAGERS};

impl Config {
    /// Validate configuration values, reporting the first problem found.
    pub(crate) fn validate(&self) -> Result<(), SvcpackError> {
        for (key, patterns) in [
            ("package.include", &self.package.include),
            ("package.exclude", &self.package.exclude),
        ] {
            validate_patterns(patterns).map_err(|e| {
                SvcpackError::Config(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: e.to_string(),
                })
            })?;
        }

        if let Some(name) = &self.package.artifact_name
            && !is_plain_file_name(name)
        {
            return Err(SvcpackError::Config(ConfigError::InvalidValue {
                key: "artifact_name".to_string(),
                value: format!("'{name}' is not a plain file name"),
            }));
        }

        if !KNOWN_MANAGERS.contains(&self.dependencies.manager.as_str()) {
            return Err(SvcpackError::Config(ConfigError::InvalidValue {
                key: "dependencies.manager".to_string(),
                value: format!(
                    "Unknown dependency manager '{}' (known: {})",
                    self.dependencies.manager,
                    KNOWN_MANAGERS.join(", ")
                ),
            }));
        }

        for (key, value) in [
            ("dependencies.manifest_file", &self.dependencies.manifest_file),
            ("dependencies.cache_dir", &self.dependencies.cache_dir),
        ] {
            if !is_plain_file_name(value) {
                return Err(SvcpackError::Config(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: format!("'{value}' must be a single path component"),
                }));
            }
        }

        if let Some(program) = &self.dependencies.program
            && program.trim().is_empty()
        {
            return Err(SvcpackError::Config(ConfigError::InvalidValue {
                key: "dependencies.program".to_string(),
                value: "must not be empty".to_string(),
            }));
        }

        if self.dependencies.timeout_secs == 0 {
            return Err(SvcpackError::Config(ConfigError::InvalidValue {
                key: "dependencies.timeout_secs".to_string(),
                value: "must be at least 1 second".to_string(),
            }));
        }

        Ok(())
    }
}
