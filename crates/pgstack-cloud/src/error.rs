//! Engine and provider error types

use thiserror::Error;

/// Cloud engine errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource {key} was partially created but read failed: {reason}")]
    PartiallyCreated { key: String, reason: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Unresolved reference: {resource}.{output}")]
    UnresolvedReference { resource: String, output: String },

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
