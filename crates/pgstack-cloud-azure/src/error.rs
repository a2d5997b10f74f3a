//! Azure provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("az not found. Please install the Azure CLI: https://aka.ms/azure-cli")]
    AzNotFound,

    #[error("az authentication failed (run `az login`): {0}")]
    AuthenticationFailed(String),

    #[error("az command failed: {0}")]
    CommandFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unsupported resource type: {0}")]
    UnsupportedResource(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] pgstack_cloud::CloudError),
}

impl From<AzureError> for pgstack_cloud::CloudError {
    fn from(e: AzureError) -> Self {
        match e {
            AzureError::CloudError(inner) => inner,
            AzureError::NotFound(msg) => pgstack_cloud::CloudError::ResourceNotFound(msg),
            AzureError::AuthenticationFailed(msg) => {
                pgstack_cloud::CloudError::AuthenticationFailed(msg)
            }
            AzureError::CommandFailed(msg) => pgstack_cloud::CloudError::CommandFailed(msg),
            AzureError::UnsupportedResource(msg) => pgstack_cloud::CloudError::InvalidConfig(msg),
            other => pgstack_cloud::CloudError::ApiError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;
