//! Unified error system for Handover
//!
//! A single error type shared by every layer. Most coordinator paths log these
//! errors and degrade to "update deferred" rather than propagating them.

use serde::{Deserialize, Serialize};

/// Unified error type for all Handover operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum HandoverError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Network or HTTP error
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Durable storage operation failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// The page or worker platform rejected an operation
    #[error("Platform error: {message}")]
    Platform {
        /// Error message reported by the platform
        message: String,
    },

    /// An operation did not complete within its bound
    #[error("Timed out after {timeout_ms}ms")]
    Timeout {
        /// The bound that elapsed
        timeout_ms: u64,
    },

    /// No worker registration has been captured yet
    #[error("No update-worker registration available")]
    NotRegistered,

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl HandoverError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the next natural trigger may succeed where this attempt failed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Platform { .. }
        )
    }
}

/// Standard Result type for Handover operations
pub type Result<T> = std::result::Result<T, HandoverError>;

impl From<serde_json::Error> for HandoverError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for HandoverError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}
