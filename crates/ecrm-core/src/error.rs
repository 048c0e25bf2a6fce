//! Error types for ecrm core operations.
//!
//! This module defines the error type shared by the model, the config loader
//! and every collaborator trait in [`crate::api`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in ecrm core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An image reference could not be parsed.
    #[error("Invalid image reference '{reference}': {reason}")]
    InvalidReference {
        /// The offending reference string.
        reference: String,
        /// Reason the reference was rejected.
        reason: String,
    },

    /// A task definition identifier could not be parsed.
    #[error("Invalid task definition identifier '{identifier}'")]
    InvalidTaskDefinition {
        /// The offending identifier (ARN or `family:revision`).
        identifier: String,
    },

    /// A duration string could not be parsed.
    #[error("Invalid duration '{input}': {reason}")]
    InvalidDuration {
        /// The offending duration string.
        input: String,
        /// Reason for the parse failure.
        reason: String,
    },

    /// Configuration is structurally valid YAML but semantically wrong.
    #[error("Invalid configuration in {section}[{index}]: {reason}")]
    Config {
        /// Config section (e.g. `repositories`).
        section: &'static str,
        /// Zero-based entry index within the section.
        index: usize,
        /// Reason the entry was rejected.
        reason: String,
    },

    /// Config file could not be read.
    #[error("Failed to read config from {path}: {source}")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// A call to the registry, cluster or function platform failed.
    #[error("{operation} failed: {message}")]
    Api {
        /// Remote operation name (e.g. `DescribeImages`).
        operation: &'static str,
        /// Rendered error from the remote service or transport.
        message: String,
    },
}

impl Error {
    /// Builds an [`Error::Api`] from any displayable error.
    pub fn api(operation: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Api {
            operation,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_reference() {
        let err = Error::InvalidReference {
            reference: "nginx".to_string(),
            reason: "missing registry host".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid image reference 'nginx': missing registry host"
        );
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config {
            section: "repositories",
            index: 2,
            reason: "expires is required".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration in repositories[2]: expires is required"
        );
    }

    #[test]
    fn test_error_display_api() {
        let err = Error::api("DescribeImages", "throttled");
        assert_eq!(err.to_string(), "DescribeImages failed: throttled");
    }
}
