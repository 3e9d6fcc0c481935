//! Driver error types and their classification for the orchestrator

use osmachine_cloud::CloudError;
use osmachine_config::ConfigError;
use std::fmt;
use thiserror::Error;

/// Errors returned by the machine driver
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Multiple found: {0}")]
    MultipleFound(String),

    #[error("Cluster/role tags are missing: {0}")]
    MissingClusterTags(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error(
        "{resource} [ID={id}] reached unexpected status {status}{}",
        .fault.as_deref().map(|f| format!(": {}", f)).unwrap_or_default()
    )]
    UnexpectedStatus {
        resource: &'static str,
        id: String,
        status: String,
        fault: Option<String>,
    },

    #[error("Invalid provider ID: {0}")]
    InvalidProviderId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<DriverError>,
    },

    #[error("{original} (cleanup failed: {})", join(.cleanup))]
    Rollback {
        original: Box<DriverError>,
        cleanup: Vec<DriverError>,
    },
}

fn join(errors: &[DriverError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ConfigError> for DriverError {
    fn from(err: ConfigError) -> Self {
        DriverError::InvalidConfig(err.to_string())
    }
}

/// Error classes understood by the node orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    MultipleFound,
    Unauthenticated,
    PermissionDenied,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NotFound",
            ErrorCode::MultipleFound => "OutOfRange",
            ErrorCode::Unauthenticated => "Unauthenticated",
            ErrorCode::PermissionDenied => "PermissionDenied",
            ErrorCode::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DriverError {
    /// Classify the error; a rollback is classified by what triggered it
    pub fn code(&self) -> ErrorCode {
        match self {
            DriverError::NotFound(_) => ErrorCode::NotFound,
            DriverError::MultipleFound(_) => ErrorCode::MultipleFound,
            DriverError::Cloud(err) => match err {
                CloudError::NotFound(_) => ErrorCode::NotFound,
                CloudError::MultipleFound(_) => ErrorCode::MultipleFound,
                CloudError::Unauthenticated(_) => ErrorCode::Unauthenticated,
                CloudError::PermissionDenied(_) => ErrorCode::PermissionDenied,
                _ => ErrorCode::Internal,
            },
            DriverError::Context { source, .. } => source.code(),
            DriverError::Rollback { original, .. } => original.code(),
            _ => ErrorCode::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }

    pub fn context(self, context: impl Into<String>) -> Self {
        DriverError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Attach cleanup failures to the error that triggered the cleanup
    pub fn with_cleanup(self, cleanup: Vec<DriverError>) -> Self {
        if cleanup.is_empty() {
            self
        } else {
            DriverError::Rollback {
                original: Box::new(self),
                cleanup,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// Layered error messages on results
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T>;
}

impl<T, E: Into<DriverError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Into::<DriverError>::into(e).context(context))
    }

    fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T> {
        self.map_err(|e| Into::<DriverError>::into(e).context(f()))
    }
}
