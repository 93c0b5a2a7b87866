//! Provider error taxonomy

use thiserror::Error;

/// Errors returned by provider adapters
///
/// The executor's handling per sub-kind:
///
/// - `Transient`: retried with bounded exponential backoff, then node Failed
/// - `Conflict` on Create: rerouted once as Update against `existing_id`
/// - `Invalid`: node Failed immediately, never retried
/// - `NotFound` during Delete: treated as success (idempotent teardown)
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The platform may have partially applied the request; safe to retry
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// The object already exists under a different identity
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        /// Physical id of the colliding object, when the platform reports one
        existing_id: Option<String>,
    },

    /// The request itself is malformed; retrying cannot help
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// The referenced object does not exist remotely
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
