//! Configuration error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a run configuration.
///
/// These are always fatal and are raised before any process is launched or
/// any remote call is made.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Missing configuration section: {0}")]
    MissingSection(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a parse error for a 1-based line number.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid value error for a dotted field name.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a generic validation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_section_names_the_section() {
        let err = ConfigError::MissingSection("logging".to_string());
        assert!(err.to_string().contains("logging"));
    }

    #[test]
    fn invalid_value_includes_field() {
        let err = ConfigError::invalid_value("connection.port", "expected an integer");
        let msg = err.to_string();
        assert!(msg.contains("connection.port"));
        assert!(msg.contains("expected an integer"));
    }
}
