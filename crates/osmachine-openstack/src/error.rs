//! OpenStack adapter error types

use osmachine_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenStackError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("No {interface} endpoint for service {service} in region {region}")]
    EndpointNotFound {
        service: String,
        region: String,
        interface: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OpenStackError>;

impl From<OpenStackError> for CloudError {
    fn from(err: OpenStackError) -> Self {
        match err {
            OpenStackError::AuthenticationFailed(msg) => CloudError::Unauthenticated(msg),
            OpenStackError::Http(e) => CloudError::Transport(e.to_string()),
            OpenStackError::Json(e) => CloudError::Json(e),
            other => CloudError::InvalidRequest(other.to_string()),
        }
    }
}
