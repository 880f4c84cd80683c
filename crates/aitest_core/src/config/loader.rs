//! Configuration file loading.

use std::fs;
use std::path::Path;

use super::errors::{ConfigError, ConfigResult};
use super::parser::parse_document;
use super::settings::Configuration;

/// Load and validate a configuration file.
///
/// Fails if the file does not exist, cannot be parsed, or lacks one of the
/// required sections.
pub fn load(path: impl AsRef<Path>) -> ConfigResult<Configuration> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    load_str(&content)
}

/// Parse and validate configuration text.
pub fn load_str(content: &str) -> ConfigResult<Configuration> {
    let document = parse_document(content)?;
    Configuration::from_document(&document)
}
