//! # Harness Errors
//!
//! Error types for the Redis Stack harness.
//!
//! This module provides the crate-wide error type covering configuration
//! problems, connection and readiness failures, missing server modules,
//! command errors surfaced by the client library, and container
//! orchestration failures.
//!
//! # Examples
//!
//! ```
//! use redis_stack_harness::error::StackError;
//!
//! let error = StackError::connection("connection refused");
//! assert!(error.is_retryable());
//!
//! let error = StackError::config("REDIS_PASSWORD is not set");
//! assert!(!error.is_retryable());
//! ```

use thiserror::Error;

/// Error type for harness operations.
///
/// Per-operation failures from the underlying client library are carried
/// through unchanged; the harness adds no recovery beyond the startup
/// readiness loop.
#[derive(Debug, Error)]
pub enum StackError {
    /// Missing or invalid configuration.
    #[error("configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Network or connection error.
    #[error("connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// The server did not become reachable within the readiness loop.
    #[error("server not ready after {attempts} attempts")]
    NotReady {
        /// Number of attempts made.
        attempts: u32,
        /// Captured container logs, when available.
        logs: Option<String>,
    },

    /// A required server module is not loaded.
    #[error("required module '{module}' is not loaded")]
    ModuleMissing {
        /// Module name as reported by `MODULE LIST`.
        module: String,
    },

    /// Command failure surfaced by the client library.
    #[error("redis command failed: {0}")]
    Command(#[from] redis::RedisError),

    /// A server reply did not have the expected shape.
    #[error("unexpected reply: {message}")]
    Reply {
        /// Error message.
        message: String,
    },

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Container orchestration failure.
    #[error("compose error: {message}")]
    Compose {
        /// Error message.
        message: String,
    },

    /// I/O failure while driving external processes.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StackError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a not-ready error.
    #[must_use]
    pub fn not_ready(attempts: u32, logs: Option<String>) -> Self {
        Self::NotReady { attempts, logs }
    }

    /// Creates a missing-module error.
    #[must_use]
    pub fn module_missing(module: impl Into<String>) -> Self {
        Self::ModuleMissing {
            module: module.into(),
        }
    }

    /// Creates an unexpected-reply error.
    #[must_use]
    pub fn reply(message: impl Into<String>) -> Self {
        Self::Reply {
            message: message.into(),
        }
    }

    /// Creates a compose error.
    #[must_use]
    pub fn compose(message: impl Into<String>) -> Self {
        Self::Compose {
            message: message.into(),
        }
    }

    /// Returns true if this error is transient and may succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::NotReady { .. } => true,
            Self::Command(e) => {
                e.is_connection_refusal() || e.is_timeout() || e.is_connection_dropped()
            }
            _ => false,
        }
    }

    /// Returns the captured container logs, if any.
    #[must_use]
    pub fn container_logs(&self) -> Option<&str> {
        match self {
            Self::NotReady { logs, .. } => logs.as_deref(),
            _ => None,
        }
    }
}

/// Result type for harness operations.
pub type StackResult<T> = Result<T, StackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_is_retryable() {
        let error = StackError::connection("refused");
        assert!(error.is_retryable());
    }

    #[test]
    fn not_ready_is_retryable() {
        let error = StackError::not_ready(5, None);
        assert!(error.is_retryable());
    }

    #[test]
    fn config_is_not_retryable() {
        let error = StackError::config("REDIS_PASSWORD is not set");
        assert!(!error.is_retryable());
    }

    #[test]
    fn module_missing_is_not_retryable() {
        let error = StackError::module_missing("search");
        assert!(!error.is_retryable());
    }

    #[test]
    fn not_ready_carries_logs() {
        let error = StackError::not_ready(3, Some("ready to accept connections".into()));
        assert_eq!(error.container_logs(), Some("ready to accept connections"));
        assert_eq!(StackError::config("x").container_logs(), None);
    }

    #[test]
    fn display_format() {
        let error = StackError::not_ready(5, None);
        assert!(error.to_string().contains("5 attempts"));

        let error = StackError::module_missing("ReJSON");
        assert!(error.to_string().contains("ReJSON"));
    }
}
