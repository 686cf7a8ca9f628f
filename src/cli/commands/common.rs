//! Helpers shared by command implementations.

use camino::Utf8Path;
use std::path::Path;

use crate::{ConfigError, SvcpackError};
use svcpack_utils::paths::to_utf8;

/// The service root as a UTF-8 path; non-UTF-8 roots cannot be packaged
/// because archive entry names must be UTF-8.
pub fn utf8_service_root(service_root: &Path) -> Result<&Utf8Path, SvcpackError> {
    to_utf8(service_root).ok_or_else(|| {
        ConfigError::InvalidValue {
            key: "service_root".to_string(),
            value: service_root.display().to_string(),
        }
        .into()
    })
}
