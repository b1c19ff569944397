//! Error types for the runner webhook operator
//!
//! Not-found conditions are never errors here: the reconciler absorbs them
//! into its outcome. Everything in this enum is surfaced to the controller,
//! recorded as an event on the autoscaler, and (when retryable) requeued with
//! backoff.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for operator operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error while reading from the cluster store
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A cluster object could not be parsed into its typed shape
    #[error("decode error for {kind}: {message}")]
    Decode {
        /// Kind of the object being decoded (e.g. "RunnerDeployment")
        kind: String,
        /// Description of what failed
        message: String,
    },

    /// GitHub API call failed
    #[error("github error [{operation}]: {message}")]
    GitHub {
        /// Operation that failed (e.g. "list_hooks", "create_hook")
        operation: String,
        /// HTTP status code, if a response was received
        status: Option<u16>,
        /// Description of what failed
        message: String,
    },

    /// Resource content is invalid and will not succeed on retry
    #[error("validation error for {resource}: {message}")]
    Validation {
        /// namespace/name of the offending resource
        resource: String,
        /// Description of what's invalid
        message: String,
    },

    /// Process configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

impl Error {
    /// Create a decode error for the given resource kind
    pub fn decode(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            kind: kind.into(),
            message: msg.into(),
        }
    }

    /// Create a GitHub error for a failed request (no response received)
    pub fn github(operation: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::GitHub {
            operation: operation.into(),
            status: None,
            message: msg.into(),
        }
    }

    /// Create a GitHub error for a non-success HTTP response
    pub fn github_status(operation: impl Into<String>, status: u16, msg: impl Into<String>) -> Self {
        Self::GitHub {
            operation: operation.into(),
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a validation error for a specific resource
    pub fn validation_for(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Decode errors are retried: the object may be rewritten by its owner.
    /// Validation and configuration errors need a human to change something.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { .. } => true,
            Error::Decode { .. } => true,
            Error::GitHub { .. } => true,
            Error::Validation { .. } => false,
            Error::Config(_) => false,
            Error::Internal { .. } => true,
        }
    }

    /// Machine-readable event reason for this error
    pub fn event_reason(&self) -> &'static str {
        use crate::events::reasons;

        match self {
            Error::Kube { .. } => reasons::GET_FAILED,
            Error::Decode { .. } => reasons::DECODE_FAILED,
            Error::GitHub { .. } => reasons::WEBHOOK_SYNC_FAILED,
            Error::Validation { .. } => reasons::VALIDATION_FAILED,
            Error::Config(_) | Error::Internal { .. } => reasons::RECONCILE_FAILED,
        }
    }
}
