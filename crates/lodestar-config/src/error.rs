//! Errors raised while assembling a [`LodestarConfig`](crate::LodestarConfig).

use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required file does not exist.
    #[error("config file {} does not exist", path.display())]
    Missing {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// A file exists but could not be read.
    #[error("cannot read config file {}", path.display())]
    Read {
        /// The file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// TOML that does not match the schema.
    #[error("bad TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON that does not match the schema.
    #[error("bad JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value the application cannot run with.
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted field path, e.g. `errors.error_route`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An override variable could not be applied.
    #[error("environment override {var}: {reason}")]
    Env {
        /// Variable name.
        var: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Input the loader does not understand, such as an unknown file format.
    #[error("{0}")]
    Unsupported(String),
}

impl ConfigError {
    /// `path` does not exist.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    /// `path` could not be read.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// `field` is invalid.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Override variable `var` is invalid.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Structurally unusable input.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_names_path() {
        let err = ConfigError::file_not_found("/etc/lodestar/app.toml");
        assert_eq!(err.to_string(), "config file /etc/lodestar/app.toml does not exist");
    }

    #[test]
    fn test_invalid_names_field() {
        let err = ConfigError::invalid_value("errors.error_route", "must start with '/'");
        assert_eq!(err.to_string(), "errors.error_route: must start with '/'");
    }

    #[test]
    fn test_env_names_variable() {
        let err = ConfigError::env_parse_error("LODESTAR__SERVER__MAX_CONNECTIONS", "expected integer");
        assert_eq!(
            err.to_string(),
            "environment override LODESTAR__SERVER__MAX_CONNECTIONS: expected integer"
        );
    }
}
