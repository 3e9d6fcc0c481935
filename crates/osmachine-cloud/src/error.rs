//! Cloud capability error types

use thiserror::Error;

/// Errors returned by the compute, network and storage capabilities
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Multiple resources found: {0}")]
    MultipleFound(String),

    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether the platform answered that the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }

    /// Whether a name resolved to more than one resource
    pub fn is_multiple_found(&self) -> bool {
        matches!(self, CloudError::MultipleFound(_))
    }

    /// Map an HTTP status code and response body onto the taxonomy
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => CloudError::Unauthenticated(message),
            403 => CloudError::PermissionDenied(message),
            404 => CloudError::NotFound(message),
            _ => CloudError::Api { status, message },
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
