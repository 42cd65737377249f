//! Error types for Guildhall.
//!
//! A small hierarchy: domain errors (`ConfigError`, `DeliveryError`,
//! `WorkflowError`) aggregate into [`GuildhallError`], which maps to a
//! process exit code at the CLI boundary.

use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for Guildhall CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Gateway error (trigger stream closed, malformed frame)
    pub const GATEWAY_ERROR: i32 = 4;

    /// Usage error (invalid arguments)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type aggregating all domain-specific errors.
#[derive(Debug, Error)]
pub enum GuildhallError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Notifier delivery error escaping the workflow layer
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Workflow rejection escaping the engine boundary
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl GuildhallError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Delivery(_) | Self::Json(_) => ExitCode::GATEWAY_ERROR,
            Self::Workflow(_) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Errors raised while loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file does not exist.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// The path that was attempted.
        path: PathBuf,
    },

    /// Configuration file exceeds the size limit.
    #[error("configuration file too large: {size} bytes (limit {limit})")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// I/O failure while reading the file.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// YAML syntax or shape error.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The path being parsed.
        path: PathBuf,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Semantic validation failure. Carries every problem found, joined.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Delivery Errors
// ============================================================================

/// Failure to deliver through the notifier.
///
/// `Forbidden` covers closed private messages and missing channel
/// permissions; `NotFound` covers destinations that no longer exist.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The destination refused delivery (closed DMs, missing permission).
    #[error("delivery forbidden: {0}")]
    Forbidden(String),

    /// The destination no longer exists.
    #[error("destination not found: {0}")]
    NotFound(String),

    /// Transport-level failure.
    #[error("transport failure: {0}")]
    Transport(String),
}

// ============================================================================
// Workflow Errors
// ============================================================================

/// Outcome taxonomy for a rejected workflow step.
///
/// Each variant carries the user-facing message. The engine boundary maps
/// these to private replies: `Validation` and `Permission` reject with no
/// state change, `NotFound` is a benign duplicate/stale trigger, and
/// `Delivery` aborts the step after the handler has rolled back any
/// partially-created entity.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Bad user input; no state was changed.
    #[error("{0}")]
    Validation(String),

    /// The actor lacks the required permission; no state was changed.
    #[error("{0}")]
    Permission(String),

    /// Stale id or already-terminal entity; treated as a duplicate trigger.
    #[error("{0}")]
    NotFound(String),

    /// A notifier call failed; the handler rolled back before returning.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_map_by_domain() {
        let e = GuildhallError::Config(ConfigError::Invalid("x".into()));
        assert_eq!(e.exit_code(), ExitCode::CONFIG_ERROR);

        let e = GuildhallError::Delivery(DeliveryError::Transport("x".into()));
        assert_eq!(e.exit_code(), ExitCode::GATEWAY_ERROR);

        let e = GuildhallError::Io(std::io::Error::other("x"));
        assert_eq!(e.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn workflow_error_displays_message() {
        let e = WorkflowError::Validation("number of winners must be between 1 and 20".into());
        assert_eq!(e.to_string(), "number of winners must be between 1 and 20");
    }
}
