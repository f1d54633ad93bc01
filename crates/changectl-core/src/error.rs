//! Unified error handling for changectl-core
//!
//! Every API, lookup, validation and polling failure surfaces as a [`CoreError`].
//!
//! # Example
//!
//! ```rust
//! use changectl_core::CoreError;
//!
//! let err = CoreError::NotFound {
//!     kind: "environment",
//!     name: "Dev".to_string(),
//!     organization: "ACME".to_string(),
//! };
//! assert!(err.is_not_found());
//! assert!(!err.is_unauthorized());
//! ```

use std::time::Duration;
use thiserror::Error;

/// Core error type for API access, name resolution and task polling
#[derive(Error, Debug)]
pub enum CoreError {
    /// Server answered with a non-success status
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Request never produced a response
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    /// A name lookup returned nothing
    #[error("Could not find {kind} [ {name} ] within organization [ {organization} ]")]
    NotFound {
        kind: &'static str,
        name: String,
        organization: String,
    },

    /// Invalid combination of inputs, detected before any request is sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Task did not reach a terminal state in time
    #[error("Task timed out after {0:?}")]
    TaskTimeout(Duration),

    /// Task reached a failed terminal state
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Returns true for lookups that matched nothing and for HTTP 404
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            CoreError::NotFound { .. } => true,
            CoreError::Api { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CoreError::Api { status: 401 | 403, .. })
    }
}
