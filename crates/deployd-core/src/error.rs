//! Error types for deployd
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for deployd operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for deployd
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or contradictory input
    #[error("Validation error: {message}")]
    Validation {
        /// Offending input field, when one can be named
        field: Option<String>,
        /// Human-readable message
        message: String,
    },

    /// Referenced deployment or config is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// DNS operation attempted with no stored provider credentials
    #[error("DNS provider configuration not found. Configure provider credentials first.")]
    ConfigMissing,

    /// The DNS provider rejected the request or did not answer in time
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Provider message
        message: String,
    },

    /// Proxy toggle attempted on a deployment without a provisioned record
    #[error("Deployment {0} has no DNS record")]
    NoDnsRecord(u64),

    /// The request conflicts with existing state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The container runtime failed to launch a deployment
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Persistence store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Process configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error tied to an input field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Create a validation error not tied to a single field
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a runtime error
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the failure originates at the DNS provider side
    ///
    /// Lets callers tell "fix your input" apart from "check provider credentials".
    pub fn is_dns_failure(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. } | Self::ConfigMissing | Self::NoDnsRecord(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
