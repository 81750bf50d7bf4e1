//! Error types used by the opvisor engine and by operation bodies.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`]: errors raised by the engine itself (shutdown).
//! - [`OperationError`]: errors raised by, or recorded for, a single launch.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logs.
//! Admission, cancellation and delivery races are never errors: the facade
//! resolves them locally and reports through return values (`false`) or events.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the engine runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some operation bodies ignored their token.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of operations whose bodies were still running.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use opvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck operations={stuck:?}")
            }
        }
    }
}

/// # Errors produced by operation execution.
///
/// An operation body returns these from [`Operation::run`](crate::Operation::run);
/// the executor adds `Timeout` and `Panicked` on its own. A failed launch delivers
/// the error through the same channels as a successful result.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// Operation body failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Operation body failed in a way the caller should not retry.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Operation body exceeded its timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Operation body panicked.
    #[error("operation panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Operation body observed its cancellation token and gave up.
    #[error("operation cancelled")]
    Canceled,
}

impl OperationError {
    /// Shorthand for [`OperationError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        OperationError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`OperationError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        OperationError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use opvisor::OperationError;
    /// use std::time::Duration;
    ///
    /// let err = OperationError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "operation_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            OperationError::Fail { .. } => "operation_failed",
            OperationError::Fatal { .. } => "operation_fatal",
            OperationError::Timeout { .. } => "operation_timeout",
            OperationError::Panicked { .. } => "operation_panicked",
            OperationError::Canceled => "operation_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            OperationError::Fail { error } => format!("error: {error}"),
            OperationError::Fatal { error } => format!("fatal: {error}"),
            OperationError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            OperationError::Panicked { info } => format!("panic: {info}"),
            OperationError::Canceled => "cancelled".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(OperationError::fail("x").as_label(), "operation_failed");
        assert_eq!(OperationError::fatal("x").as_label(), "operation_fatal");
        assert_eq!(OperationError::Canceled.as_label(), "operation_canceled");
        assert_eq!(
            OperationError::Panicked { info: "boom".into() }.as_label(),
            "operation_panicked"
        );
    }

    #[test]
    fn test_display_carries_message() {
        let err = OperationError::fail("connection refused");
        assert_eq!(err.to_string(), "execution failed: connection refused");
        assert_eq!(err.as_message(), "error: connection refused");
    }
}
