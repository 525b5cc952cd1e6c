use std::convert::Infallible;

/// Error taxonomy for workflow operations.
///
/// The first four variants are caller-correctable; `Internal` covers
/// unexpected storage and codec failures. Use [`WorkflowError::class`] to
/// translate into a 4xx/5xx-style split at an operation boundary.
#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error("no record found for id {0}")]
    NotFound(String),
    #[error("role not permitted: {0}")]
    InvalidRole(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

/// Coarse classification of a [`WorkflowError`] for callers that map
/// errors onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller can correct the request (missing record, wrong role,
    /// wrong state, bad input).
    Client,
    /// Persistence or serialization failed underneath the engine.
    Server,
}

impl WorkflowError {
    pub fn class(&self) -> ErrorClass {
        match self {
            WorkflowError::Internal(_) => ErrorClass::Server,
            _ => ErrorClass::Client,
        }
    }
}

impl From<sled::Error> for WorkflowError {
    fn from(e: sled::Error) -> Self {
        WorkflowError::Internal(e.to_string())
    }
}

impl From<minicbor::decode::Error> for WorkflowError {
    fn from(e: minicbor::decode::Error) -> Self {
        WorkflowError::Internal(e.to_string())
    }
}

impl From<minicbor::encode::Error<Infallible>> for WorkflowError {
    fn from(e: minicbor::encode::Error<Infallible>) -> Self {
        WorkflowError::Internal(e.to_string())
    }
}

impl From<anyhow::Error> for WorkflowError {
    fn from(e: anyhow::Error) -> Self {
        WorkflowError::Internal(e.to_string())
    }
}
